use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::order::{self, PaymentResult};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::orders::OrderService;
use crate::services::stripe::StripeClient;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIntentInput {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateIntentOutput {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentSuccessInput {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "Payment intent id is required"))]
    pub payment_intent_id: String,
    #[validate(email(message = "A valid email is required"))]
    pub email_address: Option<String>,
    pub payment_method: Option<String>,
}

/// Bridges orders to the external processor: intent creation before the
/// browser confirms the card, and recording the confirmation afterwards.
#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<OrderService>,
    stripe: Arc<StripeClient>,
    currency: String,
    event_sender: EventSender,
}

impl PaymentService {
    pub fn new(
        orders: Arc<OrderService>,
        stripe: Arc<StripeClient>,
        currency: String,
        event_sender: EventSender,
    ) -> Self {
        Self {
            orders,
            stripe,
            currency,
            event_sender,
        }
    }

    /// Creates a processor-side intent for the order total and returns only
    /// the client secret. Each call on an unpaid order creates a fresh live
    /// intent; prior ones are not cancelled.
    #[instrument(skip(self, requester), fields(%order_id))]
    pub async fn create_intent(
        &self,
        order_id: Uuid,
        requester: &AuthUser,
    ) -> Result<CreateIntentOutput, ServiceError> {
        let found = self.orders.get(order_id).await?;
        if found.user_id != requester.user_id && !requester.is_admin() {
            return Err(ServiceError::Forbidden(
                "Not allowed to pay for this order".to_string(),
            ));
        }
        if found.is_paid {
            return Err(ServiceError::AlreadyPaid);
        }

        let amount_minor = to_minor_units(found.total_price)?;
        let intent = self
            .stripe
            .create_payment_intent(amount_minor, &self.currency, order_id, found.user_id)
            .await?;

        self.event_sender
            .send(Event::PaymentIntentCreated {
                order_id,
                payment_intent_id: intent.id.clone(),
                amount_minor,
            })
            .await;
        info!(%order_id, intent = %intent.id, amount_minor, "payment intent created");

        let client_secret = intent.client_secret.ok_or_else(|| {
            ServiceError::UpstreamPayment("provider returned no client secret".to_string())
        })?;
        Ok(CreateIntentOutput { client_secret })
    }

    /// Records a browser-reported confirmation against the order. Safe to
    /// call after the webhook already landed; the underlying write is
    /// idempotent.
    #[instrument(skip(self, requester, input), fields(order_id = %input.order_id))]
    pub async fn record_success(
        &self,
        requester: &AuthUser,
        input: PaymentSuccessInput,
    ) -> Result<order::Model, ServiceError> {
        input.validate()?;

        let found = self.orders.get(input.order_id).await?;
        if found.user_id != requester.user_id && !requester.is_admin() {
            return Err(ServiceError::Forbidden(
                "Not allowed to update this order".to_string(),
            ));
        }

        let result = PaymentResult {
            id: input.payment_intent_id,
            status: "completed".to_string(),
            update_time: Utc::now().to_rfc3339(),
            email_address: input.email_address.or(Some(requester.email.clone())),
            payment_method: input.payment_method,
        };
        self.orders.mark_paid(input.order_id, result).await
    }

    /// Applies a verified `payment_intent.succeeded` event. Orders the event
    /// cannot be matched to are logged and acknowledged so the processor does
    /// not keep retrying a delivery this system can never consume.
    #[instrument(skip(self, object))]
    pub async fn reconcile_succeeded_intent(
        &self,
        object: &serde_json::Value,
    ) -> Result<(), ServiceError> {
        let intent_id = object.get("id").and_then(|v| v.as_str()).unwrap_or("");
        let Some(order_id) = object
            .pointer("/metadata/order_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
        else {
            warn!(intent = %intent_id, "succeeded intent carries no usable order_id metadata");
            return Ok(());
        };

        let result = PaymentResult {
            id: intent_id.to_string(),
            status: "completed".to_string(),
            update_time: Utc::now().to_rfc3339(),
            email_address: object
                .get("receipt_email")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            payment_method: Some("card".to_string()),
        };
        match self.orders.mark_paid(order_id, result).await {
            Ok(_) => {
                self.event_sender
                    .send(Event::WebhookReconciled {
                        order_id,
                        payment_intent_id: intent_id.to_string(),
                    })
                    .await;
                Ok(())
            }
            Err(ServiceError::NotFound(_)) => {
                warn!(%order_id, intent = %intent_id, "webhook references unknown order");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn to_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("Order total out of range".to_string()))
}
