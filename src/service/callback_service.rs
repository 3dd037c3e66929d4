use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::domain::donation::{Donation, DonationStatus};
use crate::domain::result::CallbackResult;
use crate::gateways::{CallbackKind, Correlation, GatewayAdapter, GatewayKind, GatewayRegistry};
use crate::lifecycle::transitions::{advance, LifecycleEvent, Transition};
use crate::repo::donations_repo::DonationsRepo;

/// Which inbound endpoint a delivery arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackChannel {
    /// Server-to-server payment notification.
    Notify,
    /// Delayed-settlement issuance notification.
    PaymentInfo,
}

/// Outcome rendered on the user-redirect result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOutcome {
    NotFound,
    Paid,
    AwaitingPayment,
    Failed,
}

pub struct ResultView {
    pub outcome: ResultOutcome,
    pub donation: Option<Donation>,
}

/// Routes raw inbound key/value payloads from either processor: figures out
/// which donation and adapter they belong to, what kind of event they carry,
/// and hands the canonical result to the state machine.
#[derive(Clone)]
pub struct CallbackService {
    pub donations_repo: DonationsRepo,
    pub registry: GatewayRegistry,
    pub reject_unverified: bool,
}

impl CallbackService {
    /// Handle a server-to-server delivery. Returns the exact response body
    /// owed to the processor: the adapter's ACK literal on success, its
    /// failure body otherwise (which makes the processor redeliver). A
    /// returned `Err` is an internal fault; the HTTP layer maps it to a
    /// non-ACK response so the delivery is retried.
    pub async fn handle_notification(
        &self,
        channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> Result<String> {
        let sniffed = self.registry.sniff(params);

        let correlation = sniffed.extract_correlation(params);
        let Some(donation) = self.correlate(&correlation).await? else {
            tracing::error!(gateway = sniffed.kind().as_str(), "no donation matches inbound callback");
            return Ok(sniffed.failure_body("Donation Not Found"));
        };

        let adapter = self.resolve_adapter(&donation, sniffed);

        if !adapter.verify_callback(params) {
            if self.reject_unverified {
                tracing::error!(donation_id = donation.id, "callback signature verification failed");
                return Ok(adapter.failure_body("Verification Failed"));
            }
            tracing::warn!(
                donation_id = donation.id,
                "callback signature verification failed; continuing (REJECT_UNVERIFIED_CALLBACKS=false)"
            );
        }

        let result = match channel {
            CallbackChannel::Notify => adapter.parse_callback(params),
            CallbackChannel::PaymentInfo => adapter.parse_payment_info_callback(params),
        };

        // The payment-info endpoint only ever receives issuance notices; the
        // notify endpoint needs the adapter's gateway-specific rule.
        let kind = match channel {
            CallbackChannel::PaymentInfo => CallbackKind::Provisioning,
            CallbackChannel::Notify => adapter.classify_callback(&result),
        };

        self.apply(&donation, &result, kind).await?;
        Ok(adapter.ack_body().to_string())
    }

    /// Handle the user-redirect result channel. It may race the
    /// server-to-server notify and arrive first or last; the persisted status
    /// always wins over whatever the redirect's own parameters claim.
    pub async fn handle_result(&self, params: &HashMap<String, String>) -> Result<ResultView> {
        let sniffed = self.registry.sniff(params);

        let correlation = sniffed.extract_correlation(params);
        let Some(donation) = self.correlate(&correlation).await? else {
            return Ok(ResultView {
                outcome: ResultOutcome::NotFound,
                donation: None,
            });
        };

        let adapter = self.resolve_adapter(&donation, sniffed);

        match donation.status {
            DonationStatus::Paid => {
                return Ok(ResultView {
                    outcome: ResultOutcome::Paid,
                    donation: Some(donation),
                })
            }
            DonationStatus::AwaitingPayment => {
                return Ok(ResultView {
                    outcome: ResultOutcome::AwaitingPayment,
                    donation: Some(donation),
                })
            }
            DonationStatus::Cancelled => {
                return Ok(ResultView {
                    outcome: ResultOutcome::Failed,
                    donation: Some(donation),
                })
            }
            DonationStatus::Pending => {}
        }

        // Still pending: the redirect beat the notify. Re-derive the
        // classification from the redirect's own payload and apply it, under
        // the same verification policy as the notify channel.
        let verified = adapter.verify_callback(params);
        if !verified && self.reject_unverified {
            tracing::error!(donation_id = donation.id, "unverified result redirect; not applying");
            return Ok(ResultView {
                outcome: ResultOutcome::Failed,
                donation: Some(donation),
            });
        }

        let result = adapter.parse_callback(params);
        let kind = adapter.classify_callback(&result);

        let outcome = match kind {
            CallbackKind::Payment if result.success => {
                self.apply(&donation, &result, CallbackKind::Payment).await?;
                ResultOutcome::Paid
            }
            CallbackKind::Provisioning => {
                self.apply(&donation, &result, CallbackKind::Provisioning).await?;
                ResultOutcome::AwaitingPayment
            }
            CallbackKind::Payment => ResultOutcome::Failed,
        };

        let donation = self.donations_repo.find(donation.id).await?;
        Ok(ResultView { outcome, donation })
    }

    /// Correlation, first match wins: internal donation id echoed through the
    /// adapter's opaque field, then the merchant trade number (for the
    /// encrypted gateway that number only exists after a defensive decrypt,
    /// which `extract_correlation` already performed).
    async fn correlate(&self, correlation: &Correlation) -> Result<Option<Donation>> {
        if let Some(id) = correlation.donation_id {
            if let Some(donation) = self.donations_repo.find(id).await? {
                return Ok(Some(donation));
            }
        }
        if let Some(trade_no) = &correlation.merchant_trade_no {
            return self.donations_repo.find_by_merchant_trade_no(trade_no).await;
        }
        Ok(None)
    }

    /// The pinned gateway wins; shape-sniffing is only the fallback for a
    /// donation that somehow never got pinned.
    fn resolve_adapter(
        &self,
        donation: &Donation,
        sniffed: Arc<dyn GatewayAdapter>,
    ) -> Arc<dyn GatewayAdapter> {
        match donation.gateway_name.as_deref().and_then(GatewayKind::parse) {
            Some(kind) => self.registry.for_kind(kind),
            None => {
                tracing::warn!(donation_id = donation.id, "donation has no pinned gateway; using payload shape");
                sniffed
            }
        }
    }

    async fn apply(
        &self,
        donation: &Donation,
        result: &CallbackResult,
        kind: CallbackKind,
    ) -> Result<()> {
        match kind {
            CallbackKind::Payment if result.success => {
                match advance(donation.status, LifecycleEvent::PaymentConfirmed) {
                    Transition::Apply(_) => {
                        let newly_paid = self.donations_repo.mark_paid(donation, result).await?;
                        if newly_paid {
                            tracing::info!(donation_id = donation.id, "donation marked paid");
                        } else {
                            tracing::info!(donation_id = donation.id, "donation was already paid; no-op");
                        }
                    }
                    Transition::Noop => {
                        tracing::info!(donation_id = donation.id, "duplicate payment notice; already paid");
                    }
                    Transition::Rejected(reason) => {
                        tracing::warn!(donation_id = donation.id, reason, "payment notice rejected");
                    }
                }
            }
            CallbackKind::Payment => {
                tracing::warn!(
                    donation_id = donation.id,
                    rtn_msg = result.rtn_msg.as_deref().unwrap_or(""),
                    "payment notice reports failure"
                );
            }
            CallbackKind::Provisioning => {
                match advance(donation.status, LifecycleEvent::PaymentInfoIssued) {
                    Transition::Apply(_) => {
                        self.donations_repo.save_payment_info(donation.id, result).await?;
                        tracing::info!(donation_id = donation.id, "payment info saved");
                    }
                    Transition::Noop => {
                        tracing::info!(donation_id = donation.id, "stale issuance notice; already paid");
                    }
                    Transition::Rejected(reason) => {
                        tracing::warn!(donation_id = donation.id, reason, "issuance notice rejected");
                    }
                }
            }
        }
        Ok(())
    }
}
