use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::auth::user;
use crate::entities::{category, order, order_item, product, product_rating};

/// Creates the schema from the entity definitions. Every statement is
/// idempotent, so running this on an already-provisioned database is a no-op.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(product_rating::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_item::Entity),
    ];
    for stmt in &mut tables {
        stmt.if_not_exists();
        db.execute(&*stmt).await?;
    }

    // One review per user per product.
    let review_unique = Index::create()
        .name("ux_product_ratings_product_user")
        .table(product_rating::Entity)
        .col(product_rating::Column::ProductId)
        .col(product_rating::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(&review_unique).await?;

    let order_user = Index::create()
        .name("ix_orders_user_id")
        .table(order::Entity)
        .col(order::Column::UserId)
        .if_not_exists()
        .to_owned();
    db.execute(&order_user).await?;

    let item_order = Index::create()
        .name("ix_order_items_order_id")
        .table(order_item::Entity)
        .col(order_item::Column::OrderId)
        .if_not_exists()
        .to_owned();
    db.execute(&item_order).await?;

    info!("database schema is up to date");
    Ok(())
}
