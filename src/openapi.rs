use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "Catalog, orders and card payments for the storefront."
    ),
    paths(
        handlers::health,
        handlers::status,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::update_me,
        handlers::products::list,
        handlers::products::featured,
        handlers::products::new_arrivals,
        handlers::products::on_sale,
        handlers::products::bestsellers,
        handlers::products::get,
        handlers::products::create,
        handlers::products::update,
        handlers::products::remove,
        handlers::products::add_review,
        handlers::categories::list,
        handlers::categories::get,
        handlers::categories::create,
        handlers::categories::update,
        handlers::categories::remove,
        handlers::orders::create,
        handlers::orders::list_mine,
        handlers::orders::list_all,
        handlers::orders::get,
        handlers::orders::update_status,
        handlers::payments::create_intent,
        handlers::payments::payment_success,
        handlers::payment_webhooks::payment_webhook,
        handlers::admin::dashboard,
        handlers::admin::list_users,
        handlers::admin::update_role,
        handlers::admin::delete_user,
        handlers::admin::toggle_featured,
        handlers::admin::toggle_new,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and build info"),
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Catalog", description = "Products, categories and reviews"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Payments", description = "Payment intents and webhooks"),
        (name = "Admin", description = "Back office")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
