use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::services::stripe;
use crate::AppState;

/// Processor callback. Verified against the raw body before any parsing;
/// unrecognized event types are acknowledged so the processor stops
/// retrying them.
#[utoipa::path(
    post,
    path = "/api/payment/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event accepted"),
        (status = 400, description = "Invalid signature", body = crate::errors::ErrorBody)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ServiceError> {
    let secret = state.config.stripe_webhook_secret.as_deref().ok_or_else(|| {
        ServiceError::InternalError("webhook secret not configured".to_string())
    })?;
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::InvalidSignature("missing signature header".to_string()))?;

    let event = stripe::construct_event(
        &body,
        signature,
        secret,
        state.config.webhook_tolerance_secs as i64,
    )?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            state
                .services
                .payments
                .reconcile_succeeded_intent(&event.data.object)
                .await?;
        }
        "payment_intent.payment_failed" => {
            let intent = event.data.object.get("id").and_then(|v| v.as_str());
            warn!(event_id = %event.id, intent, "payment failed, order left as-is");
            state
                .event_sender
                .send(crate::events::Event::PaymentFailed {
                    payment_intent_id: intent.unwrap_or_default().to_string(),
                })
                .await;
        }
        other => {
            info!(event_id = %event.id, event_type = %other, "ignoring webhook event type");
        }
    }

    Ok(StatusCode::OK)
}
