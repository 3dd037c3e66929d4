use anyhow::Result;

use crate::domain::donation::{Donation, DonationStatus};
use crate::gateways::{CheckoutForm, CheckoutUrls, GatewayRegistry};
use crate::repo::donations_repo::DonationsRepo;
use crate::service::settings_cache::SettingsCache;

pub enum CheckoutOutcome {
    NotFound,
    AlreadyPaid,
    Form(CheckoutForm),
}

#[derive(Clone)]
pub struct CheckoutService {
    pub donations_repo: DonationsRepo,
    pub registry: GatewayRegistry,
    pub settings_cache: SettingsCache,
    pub public_base_url: String,
}

impl CheckoutService {
    pub fn callback_urls(&self) -> CheckoutUrls {
        let base = self.public_base_url.trim_end_matches('/');
        CheckoutUrls {
            return_url: format!("{base}/payments/result"),
            notify_url: format!("{base}/payments/notify"),
            client_back_url: format!("{base}/"),
            payment_info_url: format!("{base}/payments/payment_info"),
        }
    }

    /// Pin the gateway, generate a fresh merchant trade number, and build the
    /// auto-submitting form. A donation already pinned keeps its gateway no
    /// matter what the site-wide setting says now.
    pub async fn begin_checkout(&self, donation_id: i64) -> Result<CheckoutOutcome> {
        let Some(donation) = self.donations_repo.find(donation_id).await? else {
            return Ok(CheckoutOutcome::NotFound);
        };
        if donation.status == DonationStatus::Paid {
            return Ok(CheckoutOutcome::AlreadyPaid);
        }

        let adapter = match donation.gateway_name.as_deref() {
            Some(pinned) => self.registry.build(pinned)?,
            None => {
                let kind = self.settings_cache.current_gateway().await?;
                self.registry.for_kind(kind)
            }
        };

        let trade_no = adapter.generate_trade_no(donation.id);
        self.donations_repo
            .pin_checkout(donation.id, adapter.kind(), &trade_no)
            .await?;

        let pinned = Donation {
            gateway_name: Some(adapter.kind().as_str().to_string()),
            merchant_trade_no: Some(trade_no),
            ..donation
        };

        let form = adapter.build_checkout_form(&pinned, &self.callback_urls())?;
        Ok(CheckoutOutcome::Form(form))
    }
}
