pub mod admin;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod stripe;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;

/// Shared service instances hung off the application state.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<catalog::CatalogService>,
    pub orders: Arc<orders::OrderService>,
    pub payments: Arc<payments::PaymentService>,
    pub admin: Arc<admin::AdminService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, event_sender: EventSender) -> Self {
        let stripe = Arc::new(stripe::StripeClient::new(
            config.stripe_api_base.clone(),
            config.stripe_secret_key.clone(),
        ));
        let catalog = Arc::new(catalog::CatalogService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(orders::OrderService::new(db.clone(), event_sender.clone()));
        let payments = Arc::new(payments::PaymentService::new(
            orders.clone(),
            stripe,
            config.currency.clone(),
            event_sender,
        ));
        let admin = Arc::new(admin::AdminService::new(db, config.admin_email.clone()));
        Self {
            catalog,
            orders,
            payments,
            admin,
        }
    }
}
