//! Client-orchestrated payment confirmation. The two traits mirror the real
//! collaborators: the storefront backend and the processor's card widget.
//! The charge itself is confirmed directly with the processor; the backend
//! only learns about it afterwards, so a failed notification never rolls the
//! charge back.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Shown when the charge went through but the backend could not be told.
/// The webhook reconciler is expected to catch the order up.
pub const PENDING_SYNC_MESSAGE: &str =
    "Payment was successful but your order status may not update immediately";

/// Backend surface used by the flow: intent creation and success callback.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_intent(&self, order_id: Uuid) -> Result<String, ServiceError>;
    async fn notify_success(
        &self,
        order_id: Uuid,
        payment_intent_id: &str,
    ) -> Result<(), ServiceError>;
}

/// What the processor reports for a confirmed charge.
#[derive(Debug, Clone)]
pub struct ConfirmedCharge {
    pub payment_intent_id: String,
}

/// Card-widget seam. Confirmation happens browser-to-processor; raw card
/// data never crosses this boundary. A decline carries the processor's own
/// human-readable message.
#[async_trait]
pub trait CardConfirmer: Send + Sync {
    async fn confirm(&self, client_secret: &str) -> Result<ConfirmedCharge, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Charge confirmed and the order record updated.
    Confirmed { payment_intent_id: String },
    /// Charge confirmed but the backend callback failed; shown with
    /// [`PENDING_SYNC_MESSAGE`].
    ConfirmedPendingSync {
        payment_intent_id: String,
        message: &'static str,
    },
    /// Processor declined; message surfaced verbatim, no automatic retry.
    Declined { message: String },
}

/// Runs the full confirmation sequence for one order. Errors before the
/// charge (intent creation failures, `AlreadyPaid`) propagate as errors;
/// anything after the charge succeeds is folded into the outcome because the
/// money has already moved.
pub async fn pay_order(
    api: &dyn PaymentApi,
    confirmer: &dyn CardConfirmer,
    order_id: Uuid,
) -> Result<PaymentOutcome, ServiceError> {
    let client_secret = api.create_intent(order_id).await?;

    let charge = match confirmer.confirm(&client_secret).await {
        Ok(charge) => charge,
        Err(message) => return Ok(PaymentOutcome::Declined { message }),
    };

    match api.notify_success(order_id, &charge.payment_intent_id).await {
        Ok(()) => Ok(PaymentOutcome::Confirmed {
            payment_intent_id: charge.payment_intent_id,
        }),
        Err(_) => Ok(PaymentOutcome::ConfirmedPendingSync {
            payment_intent_id: charge.payment_intent_id,
            message: PENDING_SYNC_MESSAGE,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeApi {
        intents_created: AtomicUsize,
        fail_notify: bool,
        already_paid: bool,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                intents_created: AtomicUsize::new(0),
                fail_notify: false,
                already_paid: false,
            }
        }
    }

    #[async_trait]
    impl PaymentApi for FakeApi {
        async fn create_intent(&self, _order_id: Uuid) -> Result<String, ServiceError> {
            if self.already_paid {
                return Err(ServiceError::AlreadyPaid);
            }
            self.intents_created.fetch_add(1, Ordering::SeqCst);
            Ok("cs_test_123".to_string())
        }

        async fn notify_success(
            &self,
            _order_id: Uuid,
            _payment_intent_id: &str,
        ) -> Result<(), ServiceError> {
            if self.fail_notify {
                Err(ServiceError::InternalError("db down".into()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeWidget {
        decline_with: Option<String>,
    }

    #[async_trait]
    impl CardConfirmer for FakeWidget {
        async fn confirm(&self, client_secret: &str) -> Result<ConfirmedCharge, String> {
            assert_eq!(client_secret, "cs_test_123");
            match &self.decline_with {
                Some(message) => Err(message.clone()),
                None => Ok(ConfirmedCharge {
                    payment_intent_id: "pi_test_1".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn happy_path_confirms() {
        let api = FakeApi::new();
        let widget = FakeWidget { decline_with: None };
        let outcome = pay_order(&api, &widget, Uuid::new_v4()).await.unwrap();
        assert_eq!(
            outcome,
            PaymentOutcome::Confirmed {
                payment_intent_id: "pi_test_1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn decline_surfaces_processor_message_verbatim() {
        let api = FakeApi::new();
        let widget = FakeWidget {
            decline_with: Some("Your card was declined.".to_string()),
        };
        let outcome = pay_order(&api, &widget, Uuid::new_v4()).await.unwrap();
        assert_eq!(
            outcome,
            PaymentOutcome::Declined {
                message: "Your card was declined.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn failed_notify_reports_pending_sync_not_an_error() {
        let mut api = FakeApi::new();
        api.fail_notify = true;
        let widget = FakeWidget { decline_with: None };
        let outcome = pay_order(&api, &widget, Uuid::new_v4()).await.unwrap();
        assert!(matches!(
            outcome,
            PaymentOutcome::ConfirmedPendingSync { message, .. } if message == PENDING_SYNC_MESSAGE
        ));
    }

    #[tokio::test]
    async fn already_paid_fails_before_any_charge() {
        let mut api = FakeApi::new();
        api.already_paid = true;
        let widget = FakeWidget { decline_with: None };
        let err = pay_order(&api, &widget, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyPaid));
        assert_eq!(api.intents_created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn each_retry_creates_a_fresh_intent() {
        let api = FakeApi::new();
        let declining = FakeWidget {
            decline_with: Some("insufficient funds".to_string()),
        };
        let accepting = FakeWidget { decline_with: None };
        let order_id = Uuid::new_v4();

        pay_order(&api, &declining, order_id).await.unwrap();
        pay_order(&api, &accepting, order_id).await.unwrap();
        assert_eq!(api.intents_created.load(Ordering::SeqCst), 2);
    }
}
