use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::config::GatewayCredentials;
use crate::domain::donation::{Donation, PaymentMethod};
use crate::domain::result::CallbackResult;
use crate::gateways::{
    trade_no_suffix, CallbackKind, CheckoutForm, CheckoutUrls, Correlation, GatewayAdapter,
    GatewayKind,
};
use crate::signing::trade_cipher::TradeCipher;

const MPG_VERSION: &str = "2.0";

/// NewebPay (藍新) adapter: parameters travel as an AES-encrypted `TradeInfo`
/// blob plus a SHA-256 `TradeSha` over the ciphertext.
pub struct NewebpayGateway {
    credentials: GatewayCredentials,
    cipher: TradeCipher,
}

impl NewebpayGateway {
    pub fn new(credentials: GatewayCredentials) -> Result<Self> {
        let cipher = TradeCipher::new(&credentials.hash_key, &credentials.hash_iv)
            .context("newebpay credentials rejected")?;
        Ok(Self { credentials, cipher })
    }

    fn method_tag(method: PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::CreditCard => "CREDIT",
            PaymentMethod::VirtualAccount => "VACC",
            PaymentMethod::CvsCode => "CVS",
            PaymentMethod::CvsBarcode => "BARCODE",
        }
    }

    fn decrypt_trade_info(&self, params: &HashMap<String, String>) -> Result<TradeInfoPayload> {
        let trade_info = params
            .get("TradeInfo")
            .context("callback has no TradeInfo field")?;
        let plaintext = self.cipher.decrypt(trade_info)?;
        let payload: TradeInfoPayload =
            serde_json::from_str(&plaintext).context("TradeInfo is not the expected JSON shape")?;
        Ok(payload)
    }
}

/// Typed view of a decrypted TradeInfo payload.
#[derive(Debug, Deserialize)]
struct TradeInfoPayload {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Result", default)]
    result: TradeInfoResult,
}

#[derive(Debug, Default, Deserialize)]
struct TradeInfoResult {
    #[serde(rename = "TradeNo", default)]
    trade_no: Option<String>,
    #[serde(rename = "MerchantOrderNo", default)]
    merchant_order_no: Option<String>,
    #[serde(rename = "PaymentType", default)]
    payment_type: Option<String>,
    #[serde(rename = "PayTime", default)]
    pay_time: Option<String>,
    #[serde(rename = "Amt", default)]
    amt: Option<i64>,
    #[serde(rename = "PayBankCode", default)]
    pay_bank_code: Option<String>,
    // Issuance notices carry BankCode; payment notices carry PayBankCode.
    #[serde(rename = "BankCode", default)]
    bank_code: Option<String>,
    #[serde(rename = "PayerAccount5Code", default)]
    payer_account_5_code: Option<String>,
    #[serde(rename = "CodeNo", default)]
    code_no: Option<String>,
    #[serde(rename = "Barcode_1", default)]
    barcode_1: Option<String>,
    #[serde(rename = "Barcode_2", default)]
    barcode_2: Option<String>,
    #[serde(rename = "Barcode_3", default)]
    barcode_3: Option<String>,
    #[serde(rename = "ExpireDate", default)]
    expire_date: Option<String>,
}

impl GatewayAdapter for NewebpayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Newebpay
    }

    fn api_url(&self) -> &str {
        &self.credentials.api_url
    }

    fn ack_body(&self) -> &'static str {
        "SUCCESS"
    }

    fn failure_body(&self, _reason: &str) -> String {
        "0".to_string()
    }

    // Max 30 chars: "N" + id + "T" + MMDDHHMMSS + 2-char suffix.
    fn generate_trade_no(&self, donation_id: i64) -> String {
        let timestamp = Utc::now().format("%m%d%H%M%S");
        format!("N{}T{}{}", donation_id, timestamp, trade_no_suffix())
    }

    fn build_checkout_form(&self, donation: &Donation, urls: &CheckoutUrls) -> Result<CheckoutForm> {
        let trade_no = donation
            .merchant_trade_no
            .clone()
            .unwrap_or_else(|| self.generate_trade_no(donation.id));
        let item_desc = format!("{} - {}", donation.donation_type.display_name(), donation.donor_name);
        let method = donation.payment_method.unwrap_or(PaymentMethod::CreditCard);

        let mut trade_params: Vec<(&str, String)> = vec![
            ("MerchantID", self.credentials.merchant_id.clone()),
            ("RespondType", "JSON".to_string()),
            ("TimeStamp", Utc::now().timestamp().to_string()),
            ("Version", MPG_VERSION.to_string()),
            ("MerchantOrderNo", trade_no),
            ("Amt", donation.amount.to_string()),
            ("ItemDesc", item_desc),
            ("ReturnURL", urls.return_url.clone()),
            ("NotifyURL", urls.notify_url.clone()),
            ("ClientBackURL", urls.client_back_url.clone()),
            ("Email", donation.email.clone().unwrap_or_default()),
            ("LoginType", "0".to_string()),
            ("OrderComment", format!("Donation#{}", donation.id)),
            (Self::method_tag(method), "1".to_string()),
        ];
        if method.is_delayed_settlement() {
            trade_params.push(("CustomerURL", urls.payment_info_url.clone()));
        }

        let plaintext = serde_urlencoded::to_string(&trade_params)
            .context("failed to url-encode trade info")?;
        let trade_info = self.cipher.encrypt(&plaintext)?;
        let trade_sha = self.cipher.trade_sha(&trade_info);

        Ok(CheckoutForm {
            action_url: self.credentials.api_url.clone(),
            fields: vec![
                ("MerchantID".into(), self.credentials.merchant_id.clone()),
                ("TradeInfo".into(), trade_info),
                ("TradeSha".into(), trade_sha),
                ("Version".into(), MPG_VERSION.into()),
            ],
        })
    }

    fn verify_callback(&self, params: &HashMap<String, String>) -> bool {
        let (Some(trade_info), Some(trade_sha)) = (params.get("TradeInfo"), params.get("TradeSha"))
        else {
            tracing::warn!("callback is missing TradeInfo or TradeSha");
            return false;
        };
        self.cipher.verify_sha(trade_info, trade_sha)
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> CallbackResult {
        let payload = match self.decrypt_trade_info(params) {
            Ok(p) => p,
            Err(e) => {
                // Malformed or tampered payload becomes a failed result, never
                // a propagated error; the ACK contract is decided upstream.
                tracing::error!(error = %e, "failed to parse newebpay callback");
                return CallbackResult {
                    rtn_code: Some("ERROR".to_string()),
                    rtn_msg: Some(e.to_string()),
                    ..CallbackResult::empty(GatewayKind::Newebpay)
                };
            }
        };

        let r = payload.result;
        CallbackResult {
            success: payload.status == "SUCCESS",
            gateway: GatewayKind::Newebpay,
            gateway_trade_no: r.trade_no,
            merchant_trade_no: r.merchant_order_no,
            rtn_code: Some(payload.status),
            rtn_msg: payload.message,
            payment_type: r.payment_type,
            payment_date: r.pay_time.as_deref().and_then(parse_newebpay_time),
            trade_amt: r.amt,
            simulate_paid: false,
            bank_code: r.pay_bank_code.or(r.bank_code),
            v_account: r.payer_account_5_code,
            payment_no: r.code_no,
            barcode_1: r.barcode_1,
            barcode_2: r.barcode_2,
            barcode_3: r.barcode_3,
            expire_date: r.expire_date.as_deref().and_then(parse_newebpay_time),
        }
    }

    // Issuance and payment notices share one wire format; the dispatcher
    // disambiguates via classify_callback.
    fn parse_payment_info_callback(&self, params: &HashMap<String, String>) -> CallbackResult {
        self.parse_callback(params)
    }

    fn classify_callback(&self, result: &CallbackResult) -> CallbackKind {
        // Payment and issuance notices both carry Status=SUCCESS; the
        // payment-method tag plus the absent pay time mark an issuance.
        let delayed_tag = matches!(
            result.payment_type.as_deref(),
            Some("VACC") | Some("CVS") | Some("BARCODE")
        );
        if delayed_tag && result.payment_date.is_none() && result.has_provisioning_fields() {
            CallbackKind::Provisioning
        } else {
            CallbackKind::Payment
        }
    }

    fn extract_correlation(&self, params: &HashMap<String, String>) -> Correlation {
        // Decryption here is defensive; a failure just means "no correlation",
        // the dispatcher falls through to not-found handling.
        match self.decrypt_trade_info(params) {
            Ok(payload) => Correlation {
                donation_id: None,
                merchant_trade_no: payload.result.merchant_order_no,
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not decrypt TradeInfo for correlation");
                Correlation::default()
            }
        }
    }
}

// NewebPay uses "2026-01-04 18:20:10" for pay times and "2026-01-11" for
// expiry dates.
fn parse_newebpay_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
