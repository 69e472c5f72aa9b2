//! Payment gateway client
//!
//! Outbound payments are HMAC-SHA256 signed over the sorted, concatenated
//! `key=value` pairs of the payload. The inbound webhook carries the same
//! signature over every field except `signature` itself.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Canonical signature base: pairs sorted by key, joined as `key=value&...`.
pub fn signature_base<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = pairs.into_iter().collect();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign(pairs: &BTreeMap<String, String>, secret: &str) -> String {
    let base = signature_base(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a webhook payload. All fields except `signature` participate in
/// the base string; extra fields the gateway adds are included as-is.
pub fn verify_webhook(payload: &serde_json::Map<String, serde_json::Value>, secret: &str) -> bool {
    let Some(signature) = payload.get("signature").and_then(|v| v.as_str()) else {
        return false;
    };
    let pairs: BTreeMap<String, String> = payload
        .iter()
        .filter(|(k, _)| k.as_str() != "signature")
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect();
    let expected = sign(&pairs, secret);
    // Hex strings are constant length; a simple comparison mirrors the
    // gateway contract.
    expected == signature
}

/// Stringify a JSON value the way it appears in form fields: strings bare,
/// everything else in its JSON rendering.
fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct GatewayResponse {
    pub payment_url: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gateway returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("gateway response missing payment_url")]
    MissingPaymentUrl,
}

pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Sign the payload and call the gateway. No retry: on any failure the
    /// caller marks the payment attempt failed and the user re-initiates.
    pub async fn initiate(
        &self,
        mut payload: BTreeMap<String, String>,
    ) -> Result<GatewayResponse, GatewayError> {
        let signature = sign(&payload, &self.config.service_secret);
        payload.insert("signature".to_string(), signature);

        let response = self.http.post(&self.config.api_url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }
        let body: GatewayResponse = response.json().await?;
        if body.payment_url.is_none() {
            return Err(GatewayError::MissingPaymentUrl);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "service-secret";

    fn sample_payload() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("amount".to_string(), "1800".to_string()),
            ("currency".to_string(), "XAF".to_string()),
            ("item_ref".to_string(), "NV-00010001".to_string()),
            ("payment_ref".to_string(), "PAY-1-1700000000000".to_string()),
        ])
    }

    #[test]
    fn test_signature_base_sorted() {
        let base = signature_base([("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(base, "a=1&b=2&c=3");
    }

    #[test]
    fn test_sign_deterministic() {
        let payload = sample_payload();
        assert_eq!(sign(&payload, SECRET), sign(&payload, SECRET));
        assert_ne!(sign(&payload, SECRET), sign(&payload, "other"));
    }

    fn signed_webhook() -> serde_json::Map<String, serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("transaction_id".into(), json!("TXN123"));
        payload.insert("payment_ref".into(), json!("PAY-1-1700000000000"));
        payload.insert("status".into(), json!("success"));
        payload.insert("amount".into(), json!("1800"));
        let pairs: BTreeMap<String, String> = payload
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
            .collect();
        payload.insert("signature".into(), json!(sign(&pairs, SECRET)));
        payload
    }

    #[test]
    fn test_webhook_verification() {
        let payload = signed_webhook();
        assert!(verify_webhook(&payload, SECRET));
    }

    #[test]
    fn test_tampered_webhook_rejected() {
        let mut payload = signed_webhook();
        payload.insert("amount".into(), json!("1"));
        assert!(!verify_webhook(&payload, SECRET));
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut payload = signed_webhook();
        payload.remove("signature");
        assert!(!verify_webhook(&payload, SECRET));
    }

    #[test]
    fn test_extra_fields_participate() {
        let mut payload = signed_webhook();
        // An unsigned extra field invalidates the signature
        payload.insert("extra".into(), json!("x"));
        assert!(!verify_webhook(&payload, SECRET));
    }
}
