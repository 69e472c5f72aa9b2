//! Webhook signature contract, exercised through the public API.

use std::collections::BTreeMap;

use serde_json::json;

use naturevita::gateway::{sign, signature_base, verify_webhook};

const SECRET: &str = "test-service-secret";

fn webhook_fields() -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
    fields.insert("transaction_id".into(), json!("MB-20260830-001"));
    fields.insert("payment_ref".into(), json!("PAY-abc-1756500000000"));
    fields.insert("status".into(), json!("success"));
    fields.insert("amount".into(), json!("4500"));
    fields.insert("currency".into(), json!("XAF"));
    fields
}

fn attach_signature(fields: &mut serde_json::Map<String, serde_json::Value>, secret: &str) {
    let pairs: BTreeMap<String, String> = fields
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
        .collect();
    let signature = sign(&pairs, secret);
    fields.insert("signature".into(), json!(signature));
}

#[test]
fn accepts_correctly_signed_payload() {
    let mut fields = webhook_fields();
    attach_signature(&mut fields, SECRET);
    assert!(verify_webhook(&fields, SECRET));
}

#[test]
fn rejects_wrong_secret() {
    let mut fields = webhook_fields();
    attach_signature(&mut fields, "some-other-secret");
    assert!(!verify_webhook(&fields, SECRET));
}

#[test]
fn rejects_modified_amount() {
    let mut fields = webhook_fields();
    attach_signature(&mut fields, SECRET);
    fields.insert("amount".into(), json!("1"));
    assert!(!verify_webhook(&fields, SECRET));
}

#[test]
fn signature_field_is_excluded_from_base() {
    // Re-signing a payload that already carries a signature must produce
    // the same signature, since the field never participates in the base.
    let mut fields = webhook_fields();
    attach_signature(&mut fields, SECRET);
    let original = fields["signature"].as_str().map(str::to_owned);

    let pairs: BTreeMap<String, String> = fields
        .iter()
        .filter(|(k, _)| k.as_str() != "signature")
        .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
        .collect();
    assert_eq!(Some(sign(&pairs, SECRET)), original);
}

#[test]
fn base_string_is_sorted_and_ampersand_joined() {
    let base = signature_base([
        ("status", "success"),
        ("amount", "4500"),
        ("payment_ref", "PAY-1"),
    ]);
    assert_eq!(base, "amount=4500&payment_ref=PAY-1&status=success");
}

#[test]
fn non_string_values_use_json_rendering() {
    // Gateways sometimes send numbers unquoted; they sign the JSON text.
    let mut fields = webhook_fields();
    fields.insert("retry_count".into(), json!(2));
    let pairs: BTreeMap<String, String> = fields
        .iter()
        .map(|(k, v)| {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect();
    let signature = sign(&pairs, SECRET);
    fields.insert("signature".into(), json!(signature));
    assert!(verify_webhook(&fields, SECRET));
}
