use std::collections::HashMap;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::config::GatewayCredentials;
use crate::domain::donation::{Donation, PaymentMethod};
use crate::domain::result::CallbackResult;
use crate::gateways::{
    trade_no_suffix, CallbackKind, CheckoutForm, CheckoutUrls, Correlation, GatewayAdapter,
    GatewayKind,
};
use crate::signing::check_mac::CheckMacCodec;

const TRADE_DESC: &str = "佳里廣澤信仰宗教協會捐獻";

// RtnCode values that mean "payment code issued", not "payment completed".
// 2 = ATM virtual account issued, 10100073 = CVS/barcode issued.
const PROVISIONING_RTN_CODES: [&str; 2] = ["2", "10100073"];

/// ECPay (綠界) adapter: plaintext form fields authenticated by a keyed
/// SHA-256 CheckMacValue.
pub struct EcpayGateway {
    credentials: GatewayCredentials,
    codec: CheckMacCodec,
}

impl EcpayGateway {
    pub fn new(credentials: GatewayCredentials) -> Self {
        let codec = CheckMacCodec {
            hash_key: credentials.hash_key.clone(),
            hash_iv: credentials.hash_iv.clone(),
        };
        Self { credentials, codec }
    }

    fn choose_payment(method: Option<PaymentMethod>) -> &'static str {
        match method {
            Some(PaymentMethod::CreditCard) => "Credit",
            Some(PaymentMethod::CvsBarcode) => "BARCODE",
            Some(PaymentMethod::CvsCode) => "CVS",
            Some(PaymentMethod::VirtualAccount) => "ATM",
            // Unset method: let the user pick on the processor's page.
            None => "ALL",
        }
    }
}

/// Typed view of an inbound ECPay callback. Raw field names stop here.
struct EcpayNotification {
    rtn_code: Option<String>,
    rtn_msg: Option<String>,
    trade_no: Option<String>,
    merchant_trade_no: Option<String>,
    payment_type: Option<String>,
    payment_date: Option<NaiveDateTime>,
    trade_amt: Option<i64>,
    simulate_paid: bool,
    bank_code: Option<String>,
    v_account: Option<String>,
    payment_no: Option<String>,
    barcode_1: Option<String>,
    barcode_2: Option<String>,
    barcode_3: Option<String>,
    expire_date: Option<NaiveDateTime>,
    custom_field_1: Option<String>,
}

impl EcpayNotification {
    fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            rtn_code: get("RtnCode"),
            rtn_msg: get("RtnMsg"),
            trade_no: get("TradeNo"),
            merchant_trade_no: get("MerchantTradeNo"),
            payment_type: get("PaymentType"),
            payment_date: get("PaymentDate").as_deref().and_then(parse_ecpay_time),
            trade_amt: get("TradeAmt").and_then(|v| v.parse().ok()),
            simulate_paid: get("SimulatePaid").as_deref() == Some("1"),
            bank_code: get("BankCode"),
            v_account: get("vAccount"),
            payment_no: get("PaymentNo"),
            barcode_1: get("Barcode1"),
            barcode_2: get("Barcode2"),
            barcode_3: get("Barcode3"),
            expire_date: get("ExpireDate").as_deref().and_then(parse_ecpay_time),
            custom_field_1: get("CustomField1"),
        }
    }

    fn success(&self) -> bool {
        self.rtn_code.as_deref() == Some("1")
    }
}

impl GatewayAdapter for EcpayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Ecpay
    }

    fn api_url(&self) -> &str {
        &self.credentials.api_url
    }

    fn ack_body(&self) -> &'static str {
        "1|OK"
    }

    fn failure_body(&self, reason: &str) -> String {
        format!("0|{}", reason)
    }

    // Max 20 chars: "D" + id + "T" + MMDDHHMMSS + 2-char suffix.
    fn generate_trade_no(&self, donation_id: i64) -> String {
        let timestamp = Utc::now().format("%m%d%H%M%S");
        format!("D{}T{}{}", donation_id, timestamp, trade_no_suffix())
    }

    fn build_checkout_form(&self, donation: &Donation, urls: &CheckoutUrls) -> Result<CheckoutForm> {
        let trade_no = donation
            .merchant_trade_no
            .clone()
            .unwrap_or_else(|| self.generate_trade_no(donation.id));

        let item_name = format!("{} - {}", donation.donation_type.display_name(), donation.donor_name);

        let mut fields: Vec<(String, String)> = vec![
            ("MerchantID".into(), self.credentials.merchant_id.clone()),
            ("MerchantTradeNo".into(), trade_no),
            ("MerchantTradeDate".into(), Utc::now().format("%Y/%m/%d %H:%M:%S").to_string()),
            ("PaymentType".into(), "aio".into()),
            ("TotalAmount".into(), donation.amount.to_string()),
            ("TradeDesc".into(), TRADE_DESC.into()),
            ("ItemName".into(), item_name),
            ("ReturnURL".into(), urls.notify_url.clone()),
            ("ChoosePayment".into(), Self::choose_payment(donation.payment_method).into()),
            ("EncryptType".into(), "1".into()),
            // Echoed back verbatim so callbacks can round-trip the internal id.
            ("CustomField1".into(), donation.id.to_string()),
            ("ClientBackURL".into(), urls.client_back_url.clone()),
            ("OrderResultURL".into(), urls.return_url.clone()),
            ("PaymentInfoURL".into(), urls.payment_info_url.clone()),
            ("NeedExtraPaidInfo".into(), "Y".into()),
        ];

        let mac = self.codec.generate(&fields);
        fields.push(("CheckMacValue".into(), mac));

        Ok(CheckoutForm {
            action_url: self.credentials.api_url.clone(),
            fields,
        })
    }

    fn verify_callback(&self, params: &HashMap<String, String>) -> bool {
        self.codec.verify(params)
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> CallbackResult {
        let n = EcpayNotification::from_params(params);

        CallbackResult {
            success: n.success(),
            gateway: GatewayKind::Ecpay,
            gateway_trade_no: n.trade_no,
            merchant_trade_no: n.merchant_trade_no,
            rtn_code: n.rtn_code,
            rtn_msg: n.rtn_msg,
            payment_type: n.payment_type,
            payment_date: n.payment_date,
            trade_amt: n.trade_amt,
            simulate_paid: n.simulate_paid,
            bank_code: n.bank_code,
            v_account: n.v_account,
            payment_no: n.payment_no,
            barcode_1: n.barcode_1,
            barcode_2: n.barcode_2,
            barcode_3: n.barcode_3,
            expire_date: n.expire_date,
        }
    }

    fn parse_payment_info_callback(&self, params: &HashMap<String, String>) -> CallbackResult {
        // Issuance is a provisioning confirmation, not a payment; the
        // notification itself is always "successful".
        CallbackResult {
            success: true,
            ..self.parse_callback(params)
        }
    }

    fn classify_callback(&self, result: &CallbackResult) -> CallbackKind {
        match result.rtn_code.as_deref() {
            Some(code) if PROVISIONING_RTN_CODES.contains(&code) => CallbackKind::Provisioning,
            _ => CallbackKind::Payment,
        }
    }

    fn extract_correlation(&self, params: &HashMap<String, String>) -> Correlation {
        let n = EcpayNotification::from_params(params);
        Correlation {
            donation_id: n.custom_field_1.and_then(|v| v.parse().ok()),
            merchant_trade_no: n.merchant_trade_no,
        }
    }
}

// ECPay sends "2026/01/04 18:20:10" for datetimes and "2026/01/11" for
// ATM expiry dates.
fn parse_ecpay_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y/%m/%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y/%m/%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
