use chrono::NaiveDateTime;
use serde::Serialize;

use crate::gateways::GatewayKind;

/// Canonical representation of an inbound gateway event. This is the only
/// shape that crosses from the adapters into the state machine; raw vendor
/// field names stop at the adapter boundary.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResult {
    pub success: bool,
    pub gateway: GatewayKind,
    pub gateway_trade_no: Option<String>,
    pub merchant_trade_no: Option<String>,
    pub rtn_code: Option<String>,
    pub rtn_msg: Option<String>,
    pub payment_type: Option<String>,
    pub payment_date: Option<NaiveDateTime>,
    pub trade_amt: Option<i64>,
    pub simulate_paid: bool,
    pub bank_code: Option<String>,
    pub v_account: Option<String>,
    pub payment_no: Option<String>,
    pub barcode_1: Option<String>,
    pub barcode_2: Option<String>,
    pub barcode_3: Option<String>,
    pub expire_date: Option<NaiveDateTime>,
}

impl CallbackResult {
    pub fn empty(gateway: GatewayKind) -> Self {
        Self {
            success: false,
            gateway,
            gateway_trade_no: None,
            merchant_trade_no: None,
            rtn_code: None,
            rtn_msg: None,
            payment_type: None,
            payment_date: None,
            trade_amt: None,
            simulate_paid: false,
            bank_code: None,
            v_account: None,
            payment_no: None,
            barcode_1: None,
            barcode_2: None,
            barcode_3: None,
            expire_date: None,
        }
    }

    pub fn has_provisioning_fields(&self) -> bool {
        self.bank_code.is_some()
            || self.v_account.is_some()
            || self.payment_no.is_some()
            || self.barcode_1.is_some()
    }
}
