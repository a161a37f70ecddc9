use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Consumed by the in-process
/// [`process_events`] loop, which currently only records them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderPaid {
        order_id: Uuid,
        payment_intent_id: String,
    },
    PaymentIntentCreated {
        order_id: Uuid,
        payment_intent_id: String,
        amount_minor: i64,
    },
    WebhookReconciled {
        order_id: Uuid,
        payment_intent_id: String,
    },
    PaymentFailed {
        payment_intent_id: String,
    },
    ProductReviewed {
        product_id: Uuid,
        user_id: Uuid,
        rating: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. A full or closed channel is logged and swallowed so
    /// event delivery never fails a request.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("dropping event, channel closed: {}", e);
        }
    }
}

/// Creates the event channel used to wire services to the processing loop.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPaid {
                order_id,
                payment_intent_id,
            } => {
                info!(%order_id, %payment_intent_id, "order paid");
            }
            Event::WebhookReconciled {
                order_id,
                payment_intent_id,
            } => {
                info!(%order_id, %payment_intent_id, "webhook reconciled order");
            }
            other => {
                info!(event = ?other, "event received");
            }
        }
    }

    info!("event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_receiver_drop_does_not_error() {
        let (tx, rx) = event_channel(4);
        drop(rx);
        tx.send(Event::OrderCreated(Uuid::new_v4())).await;
    }
}
