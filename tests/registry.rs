use std::collections::HashMap;

use donation_gateway::config::AppConfig;
use donation_gateway::gateways::{GatewayError, GatewayKind, GatewayRegistry};

#[test]
fn builds_known_gateways_and_rejects_unknown_names() {
    let registry = registry();

    assert_eq!(registry.build("ecpay").unwrap().kind(), GatewayKind::Ecpay);
    assert_eq!(registry.build("newebpay").unwrap().kind(), GatewayKind::Newebpay);

    let err = registry.build("stripe").unwrap_err();
    assert!(matches!(err, GatewayError::UnknownGateway(ref name) if name == "stripe"));
}

#[test]
fn lists_both_gateways_as_available() {
    assert_eq!(registry().available(), vec!["ecpay", "newebpay"]);
}

#[test]
fn sniffs_the_adapter_from_the_payload_shape() {
    let registry = registry();

    let mut newebpay_shaped = HashMap::new();
    newebpay_shaped.insert("TradeInfo".to_string(), "abcd".to_string());
    assert_eq!(registry.sniff(&newebpay_shaped).kind(), GatewayKind::Newebpay);

    let mut ecpay_shaped = HashMap::new();
    ecpay_shaped.insert("RtnCode".to_string(), "1".to_string());
    assert_eq!(registry.sniff(&ecpay_shaped).kind(), GatewayKind::Ecpay);
}

#[test]
fn ack_bodies_match_each_processor_contract() {
    let registry = registry();

    let ecpay = registry.for_kind(GatewayKind::Ecpay);
    assert_eq!(ecpay.ack_body(), "1|OK");
    assert_eq!(ecpay.failure_body("Donation Not Found"), "0|Donation Not Found");

    let newebpay = registry.for_kind(GatewayKind::Newebpay);
    assert_eq!(newebpay.ack_body(), "SUCCESS");
    assert_eq!(newebpay.failure_body("ignored"), "0");
}

fn registry() -> GatewayRegistry {
    GatewayRegistry::new(&AppConfig::from_env()).unwrap()
}
