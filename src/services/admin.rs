use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{user, Role};
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus};
use crate::entities::product;
use crate::errors::ServiceError;

const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub product_count: u64,
    pub order_count: u64,
    pub user_count: u64,
    /// Sum of `total_price` over paid orders.
    pub total_revenue: Decimal,
    pub pending_orders: u64,
    pub delivered_orders: u64,
    pub low_stock_products: Vec<product::Model>,
    pub recent_orders: Vec<order::Model>,
    pub top_rated_products: Vec<product::Model>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleInput {
    pub role: Role,
}

/// Account row as exposed to the back office. Never carries the hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserRow {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// Back-office operations. `bootstrap_email` identifies the account created
/// from configuration at startup, which cannot be demoted or deleted.
#[derive(Clone)]
pub struct AdminService {
    db: Arc<DbPool>,
    bootstrap_email: Option<String>,
}

impl AdminService {
    pub fn new(db: Arc<DbPool>, bootstrap_email: Option<String>) -> Self {
        Self {
            db,
            bootstrap_email,
        }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, ServiceError> {
        let product_count = product::Entity::find().count(&*self.db).await?;
        let order_count = order::Entity::find().count(&*self.db).await?;
        let user_count = user::Entity::find().count(&*self.db).await?;

        let paid_orders = order::Entity::find()
            .filter(order::Column::IsPaid.eq(true))
            .all(&*self.db)
            .await?;
        let total_revenue = paid_orders.iter().map(|o| o.total_price).sum();

        let pending_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending.to_string()))
            .count(&*self.db)
            .await?;
        let delivered_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Delivered.to_string()))
            .count(&*self.db)
            .await?;

        let low_stock_products = product::Entity::find()
            .filter(product::Column::Stock.lt(LOW_STOCK_THRESHOLD))
            .order_by_asc(product::Column::Stock)
            .limit(5)
            .all(&*self.db)
            .await?;
        let recent_orders = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(5)
            .all(&*self.db)
            .await?;
        let top_rated_products = product::Entity::find()
            .order_by_desc(product::Column::AverageRating)
            .order_by_desc(product::Column::NumReviews)
            .limit(5)
            .all(&*self.db)
            .await?;

        Ok(DashboardStats {
            product_count,
            order_count,
            user_count,
            total_revenue,
            pending_orders,
            delivered_orders,
            low_stock_products,
            recent_orders,
            top_rated_products,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>, ServiceError> {
        let rows = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(UserRow::from).collect())
    }

    #[instrument(skip(self), fields(%user_id, role = %input.role))]
    pub async fn update_role(
        &self,
        user_id: Uuid,
        input: UpdateRoleInput,
    ) -> Result<UserRow, ServiceError> {
        let found = self.get_user(user_id).await?;
        if self.is_bootstrap_admin(&found) {
            return Err(ServiceError::Forbidden(
                "The bootstrap admin role cannot be changed".to_string(),
            ));
        }
        let mut active: user::ActiveModel = found.into();
        active.role = Set(input.role.to_string());
        let updated = active.update(&*self.db).await?;
        info!(%user_id, "role updated");
        Ok(updated.into())
    }

    #[instrument(skip(self), fields(%user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let found = self.get_user(user_id).await?;
        if self.is_bootstrap_admin(&found) {
            return Err(ServiceError::Forbidden(
                "The bootstrap admin cannot be deleted".to_string(),
            ));
        }
        found.delete(&*self.db).await?;
        Ok(())
    }

    /// Flips the featured flag; returns the updated product.
    pub async fn toggle_featured(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let found = self.get_product(product_id).await?;
        let next = !found.featured;
        let mut active: product::ActiveModel = found.into();
        active.featured = Set(next);
        Ok(active.update(&*self.db).await?)
    }

    /// Flips the new-arrival flag; returns the updated product.
    pub async fn toggle_new(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let found = self.get_product(product_id).await?;
        let next = !found.is_new;
        let mut active: product::ActiveModel = found.into();
        active.is_new = Set(next);
        Ok(active.update(&*self.db).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))
    }

    async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product".to_string()))
    }

    fn is_bootstrap_admin(&self, account: &user::Model) -> bool {
        self.bootstrap_email
            .as_deref()
            .is_some_and(|email| email == account.email)
    }
}
