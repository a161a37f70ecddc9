use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{user, AuthUser};
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus, PaymentResult, ShippingAddress};
use crate::entities::{order_item, product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
    #[validate]
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusInput {
    pub status: String,
    pub tracking_number: Option<String>,
}

/// Owner identity attached to admin order listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for UserSummary {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

/// Order record with its line items and, for admin views, the owner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Persists an order from a cart snapshot. Line item name, unit price and
    /// image are snapshotted from the live product so later catalog edits do
    /// not rewrite order history.
    #[instrument(skip(self, input), fields(%user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<OrderView, ServiceError> {
        input.validate()?;

        if input.total_price != input.items_price + input.tax_price + input.shipping_price {
            return Err(ServiceError::ValidationError(
                "Total price must equal items plus tax plus shipping".to_string(),
            ));
        }

        // Resolve every referenced product up front.
        let mut snapshots = Vec::with_capacity(input.items.len());
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
            let found = product::Entity::find_by_id(item.product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product".to_string()))?;
            if item.quantity > found.stock {
                return Err(ServiceError::ValidationError(format!(
                    "Insufficient stock for {}",
                    found.name
                )));
            }
            snapshots.push((found, item.quantity));
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let shipping_address = serde_json::to_value(&input.shipping_address)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let txn = self.db.begin().await?;
        let created = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending.to_string()),
            shipping_address: Set(shipping_address),
            payment_method: Set(input.payment_method),
            payment_result: Set(None),
            items_price: Set(input.items_price),
            tax_price: Set(input.tax_price),
            shipping_price: Set(input.shipping_price),
            total_price: Set(input.total_price),
            is_paid: Set(false),
            paid_at: Set(None),
            tracking_number: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(snapshots.len());
        for (snapshot, quantity) in &snapshots {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(snapshot.id),
                name: Set(snapshot.name.clone()),
                image: Set(snapshot.display_image()),
                unit_price: Set(snapshot.discounted_price()),
                quantity: Set(*quantity),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }
        txn.commit().await?;

        // Best-effort decrement, not transactional with the insert above.
        for (snapshot, quantity) in &snapshots {
            let result = product::Entity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(*quantity),
                )
                .filter(product::Column::Id.eq(snapshot.id))
                .exec(&*self.db)
                .await;
            if let Err(e) = result {
                warn!(product_id = %snapshot.id, "stock decrement failed: {}", e);
            }
        }

        self.event_sender.send(Event::OrderCreated(order_id)).await;
        info!(%order_id, "order created");

        Ok(OrderView {
            order: created,
            items,
            user: None,
        })
    }

    pub async fn get(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order".to_string()))
    }

    /// Fetches an order for a caller who must be its owner or an admin.
    #[instrument(skip(self, requester), fields(%order_id))]
    pub async fn get_order_authorized(
        &self,
        order_id: Uuid,
        requester: &AuthUser,
    ) -> Result<OrderView, ServiceError> {
        let found = self.get(order_id).await?;
        if found.user_id != requester.user_id && !requester.is_admin() {
            return Err(ServiceError::Forbidden(
                "Not allowed to view this order".to_string(),
            ));
        }
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderView {
            order: found,
            items,
            user: None,
        })
    }

    /// All orders owned by one user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        let rows = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(order_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderView {
                order,
                items,
                user: None,
            })
            .collect())
    }

    /// Every order, newest first, with the owner populated.
    pub async fn list_all(&self) -> Result<Vec<OrderView>, ServiceError> {
        let rows = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .find_also_related(user::Entity)
            .all(&*self.db)
            .await?;
        let mut views = Vec::with_capacity(rows.len());
        for (order, owner) in rows {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .all(&*self.db)
                .await?;
            views.push(OrderView {
                order,
                items,
                user: owner.map(UserSummary::from),
            });
        }
        Ok(views)
    }

    /// Admin status override. Any of the five recognized statuses may be set;
    /// anything else is rejected before touching the database.
    #[instrument(skip(self, input), fields(%order_id, status = %input.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        input: UpdateOrderStatusInput,
    ) -> Result<order::Model, ServiceError> {
        let status: OrderStatus = input
            .status
            .parse()
            .map_err(|_| ServiceError::InvalidStatus(input.status.clone()))?;

        let found = self.get(order_id).await?;
        let old_status = found.status.clone();
        let mut active: order::ActiveModel = found.into();
        active.status = Set(status.to_string());
        if let Some(tracking) = input.tracking_number {
            active.tracking_number = Set(Some(tracking));
        }
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: updated.status.clone(),
            })
            .await;
        Ok(updated)
    }

    /// Marks an order paid. Idempotent: the write is a compare-and-set guarded
    /// by `is_paid = false`, so out of any number of racing callers exactly one
    /// payment result is retained and `paid_at` is never overwritten.
    #[instrument(skip(self, result), fields(%order_id, intent = %result.id))]
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        result: PaymentResult,
    ) -> Result<order::Model, ServiceError> {
        let found = self.get(order_id).await?;
        if found.is_paid {
            return Ok(found);
        }

        let payment_result = serde_json::to_value(&result)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let updated = order::Entity::update_many()
            .col_expr(order::Column::IsPaid, Expr::value(true))
            .col_expr(order::Column::PaidAt, Expr::value(Utc::now()))
            .col_expr(order::Column::PaymentResult, Expr::value(payment_result))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::IsPaid.eq(false))
            .exec(&*self.db)
            .await?;

        if updated.rows_affected > 0 {
            // Advance pending orders into fulfilment. Guarded the same way so
            // a racing admin status write is never clobbered.
            order::Entity::update_many()
                .col_expr(
                    order::Column::Status,
                    Expr::value(OrderStatus::Processing.to_string()),
                )
                .filter(order::Column::Id.eq(order_id))
                .filter(order::Column::Status.eq(OrderStatus::Pending.to_string()))
                .exec(&*self.db)
                .await?;

            self.event_sender
                .send(Event::OrderPaid {
                    order_id,
                    payment_intent_id: result.id,
                })
                .await;
        }

        self.get(order_id).await
    }
}
