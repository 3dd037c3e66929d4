use std::collections::HashMap;

use donation_gateway::config::GatewayCredentials;
use donation_gateway::gateways::ecpay::EcpayGateway;
use donation_gateway::gateways::newebpay::NewebpayGateway;
use donation_gateway::gateways::{CallbackKind, GatewayAdapter, GatewayKind};
use donation_gateway::signing::trade_cipher::TradeCipher;

#[test]
fn ecpay_success_notification_parses() {
    let params = ecpay_params(&[
        ("RtnCode", "1"),
        ("RtnMsg", "交易成功"),
        ("TradeNo", "2501041820109999"),
        ("MerchantTradeNo", "D7T0104182010AB"),
        ("PaymentType", "Credit_CreditCard"),
        ("PaymentDate", "2026/01/04 18:20:10"),
        ("TradeAmt", "500"),
        ("SimulatePaid", "0"),
        ("CustomField1", "7"),
    ]);

    let result = ecpay().parse_callback(&params);
    assert!(result.success);
    assert_eq!(result.gateway, GatewayKind::Ecpay);
    assert_eq!(result.gateway_trade_no.as_deref(), Some("2501041820109999"));
    assert_eq!(result.merchant_trade_no.as_deref(), Some("D7T0104182010AB"));
    assert_eq!(result.trade_amt, Some(500));
    assert!(!result.simulate_paid);
    assert!(result.payment_date.is_some());
}

#[test]
fn ecpay_failure_notification_is_not_success() {
    let params = ecpay_params(&[
        ("RtnCode", "10200095"),
        ("RtnMsg", "交易失敗"),
        ("MerchantTradeNo", "D7T0104182010AB"),
    ]);

    let result = ecpay().parse_callback(&params);
    assert!(!result.success);
    assert_eq!(result.rtn_code.as_deref(), Some("10200095"));
}

#[test]
fn ecpay_issuance_codes_classify_as_provisioning() {
    let gateway = ecpay();

    let atm = gateway.parse_callback(&ecpay_params(&[
        ("RtnCode", "2"),
        ("BankCode", "007"),
        ("vAccount", "9103522175887271"),
        ("ExpireDate", "2026/01/11"),
    ]));
    assert_eq!(gateway.classify_callback(&atm), CallbackKind::Provisioning);
    assert_eq!(atm.bank_code.as_deref(), Some("007"));
    assert!(atm.expire_date.is_some());

    let cvs = gateway.parse_callback(&ecpay_params(&[
        ("RtnCode", "10100073"),
        ("PaymentNo", "GW552312351"),
    ]));
    assert_eq!(gateway.classify_callback(&cvs), CallbackKind::Provisioning);

    let paid = gateway.parse_callback(&ecpay_params(&[("RtnCode", "1")]));
    assert_eq!(gateway.classify_callback(&paid), CallbackKind::Payment);
}

#[test]
fn ecpay_payment_info_channel_is_always_successful() {
    let result = ecpay().parse_payment_info_callback(&ecpay_params(&[
        ("RtnCode", "2"),
        ("BankCode", "007"),
        ("vAccount", "9103522175887271"),
    ]));
    assert!(result.success);
}

#[test]
fn ecpay_correlation_prefers_the_echoed_donation_id() {
    let gateway = ecpay();

    let both = gateway.extract_correlation(&ecpay_params(&[
        ("CustomField1", "7"),
        ("MerchantTradeNo", "D7T0104182010AB"),
    ]));
    assert_eq!(both.donation_id, Some(7));
    assert_eq!(both.merchant_trade_no.as_deref(), Some("D7T0104182010AB"));

    let trade_no_only = gateway.extract_correlation(&ecpay_params(&[(
        "MerchantTradeNo",
        "D7T0104182010AB",
    )]));
    assert_eq!(trade_no_only.donation_id, None);

    let garbage_id = gateway.extract_correlation(&ecpay_params(&[("CustomField1", "not-a-number")]));
    assert_eq!(garbage_id.donation_id, None);
}

#[test]
fn newebpay_success_notification_parses() {
    let gateway = newebpay();
    let params = newebpay_params(
        r#"{"Status":"SUCCESS","Message":"授權成功","Result":{"TradeNo":"25010418201012345","MerchantOrderNo":"N7T0104182010AB","PaymentType":"CREDIT","PayTime":"2026-01-04 18:20:10","Amt":500}}"#,
    );

    assert!(gateway.verify_callback(&params));

    let result = gateway.parse_callback(&params);
    assert!(result.success);
    assert_eq!(result.gateway, GatewayKind::Newebpay);
    assert_eq!(result.gateway_trade_no.as_deref(), Some("25010418201012345"));
    assert_eq!(result.merchant_trade_no.as_deref(), Some("N7T0104182010AB"));
    assert_eq!(result.trade_amt, Some(500));
    assert!(result.payment_date.is_some());
    assert_eq!(gateway.classify_callback(&result), CallbackKind::Payment);
}

#[test]
fn newebpay_failure_status_is_not_success() {
    let gateway = newebpay();
    let params = newebpay_params(
        r#"{"Status":"MPG03009","Message":"授權失敗","Result":{"MerchantOrderNo":"N7T0104182010AB"}}"#,
    );

    let result = gateway.parse_callback(&params);
    assert!(!result.success);
    assert_eq!(result.rtn_code.as_deref(), Some("MPG03009"));
}

#[test]
fn newebpay_tampered_payload_fails_closed() {
    let gateway = newebpay();
    let mut params = newebpay_params(
        r#"{"Status":"SUCCESS","Result":{"MerchantOrderNo":"N7T0104182010AB","Amt":500}}"#,
    );

    let tampered = flip_first_hex_char(&params["TradeInfo"]);
    params.insert("TradeInfo".to_string(), tampered);

    assert!(!gateway.verify_callback(&params));

    let result = gateway.parse_callback(&params);
    assert!(!result.success);
    assert_eq!(result.rtn_code.as_deref(), Some("ERROR"));
}

#[test]
fn newebpay_missing_sha_fails_verification() {
    let gateway = newebpay();
    let mut params = newebpay_params(r#"{"Status":"SUCCESS","Result":{}}"#);
    params.remove("TradeSha");
    assert!(!gateway.verify_callback(&params));
}

#[test]
fn newebpay_issuance_notice_classifies_as_provisioning() {
    let gateway = newebpay();

    let vacc = gateway.parse_callback(&newebpay_params(
        r#"{"Status":"SUCCESS","Message":"取號成功","Result":{"MerchantOrderNo":"N7T0104182010AB","PaymentType":"VACC","BankCode":"808","Amt":500,"ExpireDate":"2026-01-11"}}"#,
    ));
    assert_eq!(gateway.classify_callback(&vacc), CallbackKind::Provisioning);
    assert_eq!(vacc.bank_code.as_deref(), Some("808"));
    assert!(vacc.expire_date.is_some());

    let cvs = gateway.parse_callback(&newebpay_params(
        r#"{"Status":"SUCCESS","Result":{"MerchantOrderNo":"N7T0104182010AB","PaymentType":"CVS","CodeNo":"CVS12345678","Amt":500}}"#,
    ));
    assert_eq!(gateway.classify_callback(&cvs), CallbackKind::Provisioning);
    assert_eq!(cvs.payment_no.as_deref(), Some("CVS12345678"));

    // A paid VACC notice has a pay time and classifies as payment.
    let paid = gateway.parse_callback(&newebpay_params(
        r#"{"Status":"SUCCESS","Result":{"MerchantOrderNo":"N7T0104182010AB","PaymentType":"VACC","PayBankCode":"808","PayTime":"2026-01-05 09:00:00","Amt":500}}"#,
    ));
    assert_eq!(gateway.classify_callback(&paid), CallbackKind::Payment);
}

#[test]
fn newebpay_correlation_comes_from_the_decrypted_order_number() {
    let gateway = newebpay();

    let correlation = gateway.extract_correlation(&newebpay_params(
        r#"{"Status":"SUCCESS","Result":{"MerchantOrderNo":"N7T0104182010AB"}}"#,
    ));
    assert_eq!(correlation.donation_id, None);
    assert_eq!(correlation.merchant_trade_no.as_deref(), Some("N7T0104182010AB"));

    // Undecryptable payloads correlate to nothing instead of erroring.
    let mut params = newebpay_params(r#"{"Status":"SUCCESS","Result":{}}"#);
    params.insert("TradeInfo".to_string(), "deadbeef".repeat(8));
    let correlation = gateway.extract_correlation(&params);
    assert_eq!(correlation.donation_id, None);
    assert_eq!(correlation.merchant_trade_no, None);
}

const NEWEBPAY_KEY: &str = "Fs5cX1TGqYM2PpdrLvSJrFzQcDmNbKeA";
const NEWEBPAY_IV: &str = "C9oVvLxjkWpJbTq2";

fn ecpay() -> EcpayGateway {
    EcpayGateway::new(GatewayCredentials {
        merchant_id: "2000132".to_string(),
        hash_key: "5294y06JbISpM5x9".to_string(),
        hash_iv: "v77hoKGq4kWxNNIS".to_string(),
        api_url: "https://payment-stage.ecpay.com.tw/Cashier/AioCheckOut/V5".to_string(),
    })
}

fn newebpay() -> NewebpayGateway {
    NewebpayGateway::new(GatewayCredentials {
        merchant_id: "MS000000001".to_string(),
        hash_key: NEWEBPAY_KEY.to_string(),
        hash_iv: NEWEBPAY_IV.to_string(),
        api_url: "https://ccore.newebpay.com/MPG/mpg_gateway".to_string(),
    })
    .unwrap()
}

fn ecpay_params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Builds a NewebPay delivery the way the processor does: encrypt the JSON,
/// then hash the ciphertext.
fn newebpay_params(trade_info_json: &str) -> HashMap<String, String> {
    let cipher = TradeCipher::new(NEWEBPAY_KEY, NEWEBPAY_IV).unwrap();
    let trade_info = cipher.encrypt(trade_info_json).unwrap();
    let trade_sha = cipher.trade_sha(&trade_info);

    let mut params = HashMap::new();
    params.insert("Status".to_string(), "SUCCESS".to_string());
    params.insert("MerchantID".to_string(), "MS000000001".to_string());
    params.insert("TradeInfo".to_string(), trade_info);
    params.insert("TradeSha".to_string(), trade_sha);
    params.insert("Version".to_string(), "2.0".to_string());
    params
}

fn flip_first_hex_char(hex: &str) -> String {
    let mut chars: Vec<char> = hex.chars().collect();
    chars[0] = if chars[0] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}
