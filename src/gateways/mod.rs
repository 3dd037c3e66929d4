use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::domain::donation::Donation;
use crate::domain::result::CallbackResult;

pub mod ecpay;
pub mod newebpay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Ecpay,
    Newebpay,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Ecpay => "ecpay",
            GatewayKind::Newebpay => "newebpay",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ecpay" => Some(GatewayKind::Ecpay),
            "newebpay" => Some(GatewayKind::Newebpay),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown payment gateway: {0}")]
    UnknownGateway(String),
}

/// Callback endpoints handed to the processor at checkout time.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// User-redirect result page.
    pub return_url: String,
    /// Server-to-server payment notification.
    pub notify_url: String,
    /// Where the processor's "back to merchant" link points.
    pub client_back_url: String,
    /// Delayed-settlement issuance notification.
    pub payment_info_url: String,
}

/// A renderable auto-submitting POST form targeting the processor.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    pub action_url: String,
    pub fields: Vec<(String, String)>,
}

impl CheckoutForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What kind of event an inbound delivery represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// Money moved (or failed to).
    Payment,
    /// A delayed-settlement code/account was issued; nothing paid yet.
    Provisioning,
}

/// Identifiers a callback carries that let us find the donation it belongs to.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    pub donation_id: Option<i64>,
    pub merchant_trade_no: Option<String>,
}

/// The uniform contract both processors are driven through. Adapters are
/// stateless with respect to any single transaction; everything they need
/// arrives through the call arguments.
pub trait GatewayAdapter: Send + Sync {
    fn kind(&self) -> GatewayKind;

    fn api_url(&self) -> &str;

    /// Literal body the processor requires as an explicit ACK; anything else
    /// triggers its retry policy.
    fn ack_body(&self) -> &'static str;

    fn failure_body(&self, reason: &str) -> String;

    /// Merchant trade number: donation id + timestamp + random suffix. The
    /// suffix guards against same-second collisions on rapid retries.
    fn generate_trade_no(&self, donation_id: i64) -> String;

    fn build_checkout_form(&self, donation: &Donation, urls: &CheckoutUrls) -> Result<CheckoutForm>;

    fn verify_callback(&self, params: &HashMap<String, String>) -> bool;

    fn parse_callback(&self, params: &HashMap<String, String>) -> CallbackResult;

    fn parse_payment_info_callback(&self, params: &HashMap<String, String>) -> CallbackResult;

    fn classify_callback(&self, result: &CallbackResult) -> CallbackKind;

    fn extract_correlation(&self, params: &HashMap<String, String>) -> Correlation;
}

impl std::fmt::Debug for dyn GatewayAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayAdapter")
            .field("kind", &self.kind())
            .finish()
    }
}

#[derive(Clone)]
pub struct GatewayRegistry {
    ecpay: Arc<ecpay::EcpayGateway>,
    newebpay: Arc<newebpay::NewebpayGateway>,
}

impl GatewayRegistry {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            ecpay: Arc::new(ecpay::EcpayGateway::new(cfg.ecpay.clone())),
            newebpay: Arc::new(newebpay::NewebpayGateway::new(cfg.newebpay.clone())?),
        })
    }

    pub fn build(&self, name: &str) -> Result<Arc<dyn GatewayAdapter>, GatewayError> {
        match GatewayKind::parse(name) {
            Some(kind) => Ok(self.for_kind(kind)),
            None => Err(GatewayError::UnknownGateway(name.to_string())),
        }
    }

    pub fn for_kind(&self, kind: GatewayKind) -> Arc<dyn GatewayAdapter> {
        match kind {
            GatewayKind::Ecpay => self.ecpay.clone(),
            GatewayKind::Newebpay => self.newebpay.clone(),
        }
    }

    pub fn available(&self) -> Vec<&'static str> {
        vec![GatewayKind::Ecpay.as_str(), GatewayKind::Newebpay.as_str()]
    }

    /// Shape-sniff an inbound payload. Only used before the donation (and its
    /// pinned gateway) has been loaded.
    pub fn sniff(&self, params: &HashMap<String, String>) -> Arc<dyn GatewayAdapter> {
        if params.contains_key("TradeInfo") {
            self.newebpay.clone()
        } else {
            self.ecpay.clone()
        }
    }
}

pub(crate) fn trade_no_suffix() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..2)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
