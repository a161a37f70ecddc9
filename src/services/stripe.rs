//! Thin Stripe API client plus webhook signature verification.
//!
//! Only the payment-intent surface is wired up; requests go over the
//! form-encoded REST API so the crate does not depend on a full SDK. The base
//! URL is configurable so tests can point the client at a local mock server.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// A created or retrieved payment intent, as reported by the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Minimal webhook event envelope. `data.object` is kept as raw JSON because
/// only a few fields of the inner object are ever read.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }

    /// Creates a card payment intent denominated in minor units.
    #[instrument(skip(self), fields(%order_id, amount_minor))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<PaymentIntent, ServiceError> {
        let amount = amount_minor.to_string();
        let order_id = order_id.to_string();
        let user_id = user_id.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
            ("metadata[order_id]", order_id.as_str()),
            ("metadata[user_id]", user_id.as_str()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .timeout(std::time::Duration::from_secs(30))
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamPayment(format!("payment provider unreachable: {e}")))?;

        if response.status().is_success() {
            response
                .json::<PaymentIntent>()
                .await
                .map_err(|e| ServiceError::UpstreamPayment(format!("malformed provider response: {e}")))
        } else {
            let status = response.status();
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("payment provider returned {status}"));
            warn!(%status, %message, "payment intent creation failed");
            Err(ServiceError::UpstreamPayment(message))
        }
    }
}

/// Verifies a `Stripe-Signature` header (`t=<ts>,v1=<hmac>` scheme) against
/// the raw request body and parses the event. The signed payload is
/// `"{t}.{body}"`, the MAC is HMAC-SHA256 over it with the endpoint secret.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<WebhookEvent, ServiceError> {
    let mut timestamp = "";
    let mut v1 = "";
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", val)) => timestamp = val,
            Some(("v1", val)) => v1 = val,
            _ => {}
        }
    }
    if timestamp.is_empty() || v1.is_empty() {
        return Err(ServiceError::InvalidSignature(
            "missing t or v1 component".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ServiceError::InvalidSignature("non-numeric timestamp".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > tolerance_secs {
        return Err(ServiceError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InvalidSignature("invalid secret".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    if !constant_time_eq(&expected, v1) {
        return Err(ServiceError::InvalidSignature(
            "signature mismatch".to_string(),
        ));
    }

    serde_json::from_slice(payload)
        .map_err(|e| ServiceError::InvalidSignature(format!("invalid event payload: {e}")))
}

/// Computes a valid signature header for a payload. Used by tests to forge
/// well-signed webhook deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn event_json() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1", "metadata": { "order_id": "abc" } } }
        }))
        .unwrap()
    }

    #[test]
    fn valid_signature_parses_event() {
        let payload = event_json();
        let header = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp());
        let event = construct_event(&payload, &header, SECRET, 300).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object["id"], "pi_1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = event_json();
        let header = sign_payload(&payload, "whsec_other", chrono::Utc::now().timestamp());
        assert!(matches!(
            construct_event(&payload, &header, SECRET, 300),
            Err(ServiceError::InvalidSignature(_))
        ));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let payload = event_json();
        let header = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp());
        let mut tampered = payload.clone();
        tampered[10] ^= 1;
        assert!(construct_event(&tampered, &header, SECRET, 300).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = event_json();
        let header = sign_payload(&payload, SECRET, chrono::Utc::now().timestamp() - 3600);
        assert!(construct_event(&payload, &header, SECRET, 300).is_err());
    }

    #[test]
    fn header_without_v1_is_rejected() {
        let payload = event_json();
        assert!(construct_event(&payload, "t=123", SECRET, 300).is_err());
    }
}
