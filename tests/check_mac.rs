use std::collections::HashMap;

use donation_gateway::signing::check_mac::{dotnet_urlencode, CheckMacCodec};

#[test]
fn canonical_string_sorts_keys_case_insensitively() {
    let codec = codec();
    let fields = vec![
        ("b".to_string(), "2".to_string()),
        ("A".to_string(), "1".to_string()),
    ];
    assert_eq!(
        codec.canonicalize(&fields),
        "HashKey=5294y06JbISpM5x9&A=1&b=2&HashIV=v77hoKGq4kWxNNIS"
    );
}

#[test]
fn signature_field_is_excluded_from_the_canonical_string() {
    let codec = codec();
    let with_sig = vec![
        ("Amt".to_string(), "100".to_string()),
        ("CheckMacValue".to_string(), "ABCDEF".to_string()),
    ];
    let without_sig = vec![("Amt".to_string(), "100".to_string())];
    assert_eq!(codec.canonicalize(&with_sig), codec.canonicalize(&without_sig));
}

#[test]
fn generated_mac_verifies() {
    let codec = codec();
    let fields = sample_fields();

    let mac = codec.generate(&fields);
    let mut params: HashMap<String, String> = fields.into_iter().collect();
    params.insert("CheckMacValue".to_string(), mac);

    assert!(codec.verify(&params));
}

#[test]
fn tampered_value_fails_verification() {
    let codec = codec();
    let fields = sample_fields();

    let mac = codec.generate(&fields);
    let mut params: HashMap<String, String> = fields.into_iter().collect();
    params.insert("CheckMacValue".to_string(), mac);
    params.insert("TradeAmt".to_string(), "99999".to_string());

    assert!(!codec.verify(&params));
}

#[test]
fn missing_signature_fails_verification() {
    let codec = codec();
    let params: HashMap<String, String> = sample_fields().into_iter().collect();
    assert!(!codec.verify(&params));
}

#[test]
fn lowercase_received_mac_still_verifies() {
    let codec = codec();
    let fields = sample_fields();

    let mac = codec.generate(&fields).to_lowercase();
    let mut params: HashMap<String, String> = fields.into_iter().collect();
    params.insert("CheckMacValue".to_string(), mac);

    assert!(codec.verify(&params));
}

#[test]
fn blank_values_are_excluded_when_verifying() {
    let codec = codec();
    let fields = sample_fields();

    let mac = codec.generate(&fields);
    let mut params: HashMap<String, String> = fields.into_iter().collect();
    params.insert("CheckMacValue".to_string(), mac);
    // Processors send optional fields as empty strings; they are not signed.
    params.insert("PaymentNo".to_string(), "".to_string());
    params.insert("BankCode".to_string(), "  ".to_string());

    assert!(codec.verify(&params));
}

#[test]
fn urlencode_follows_dotnet_conventions() {
    assert_eq!(dotnet_urlencode("Hello World!"), "hello+world!");
    assert_eq!(dotnet_urlencode("a*b(c)-_."), "a*b(c)-_.");
    assert_eq!(dotnet_urlencode("100"), "100");
    assert_eq!(dotnet_urlencode("k=v&x=y"), "k%3dv%26x%3dy");
}

fn codec() -> CheckMacCodec {
    CheckMacCodec {
        hash_key: "5294y06JbISpM5x9".to_string(),
        hash_iv: "v77hoKGq4kWxNNIS".to_string(),
    }
}

fn sample_fields() -> Vec<(String, String)> {
    vec![
        ("MerchantID".to_string(), "2000132".to_string()),
        ("MerchantTradeNo".to_string(), "D7T0104182010AB".to_string()),
        ("RtnCode".to_string(), "1".to_string()),
        ("RtnMsg".to_string(), "交易成功".to_string()),
        ("TradeAmt".to_string(), "500".to_string()),
        ("TradeNo".to_string(), "2501041820109999".to_string()),
        ("PaymentDate".to_string(), "2026/01/04 18:20:10".to_string()),
        ("CustomField1".to_string(), "7".to_string()),
    ]
}
