use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::{category, product, product_rating};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub const PAGE_SIZE: u64 = 10;
const COLLECTION_LIMIT: u64 = 8;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductFilters {
    /// Case-insensitive match against product names.
    pub keyword: Option<String>,
    pub category: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
    /// One of `price_asc`, `price_desc`, `rating`, `newest` (default).
    pub sort: Option<String>,
    /// 1-based page number.
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<product::Model>,
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<category::Model>,
    pub ratings: Vec<product_rating::Model>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: Decimal,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    #[serde(default)]
    pub discount: i32,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    pub specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100"))]
    pub discount: Option<i32>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub specifications: Option<serde_json::Value>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewInput {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review text is required"))]
    pub review: String,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, filters))]
    pub async fn list_products(&self, filters: ProductFilters) -> Result<ProductPage, ServiceError> {
        let mut condition = Condition::all();
        if let Some(keyword) = &filters.keyword {
            condition = condition.add(product::Column::Name.contains(keyword.as_str()));
        }
        if let Some(category_id) = filters.category {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = filters.min_price {
            condition = condition.add(product::Column::Price.gte(min));
        }
        if let Some(max) = filters.max_price {
            condition = condition.add(product::Column::Price.lte(max));
        }
        if let Some(featured) = filters.featured {
            condition = condition.add(product::Column::Featured.eq(featured));
        }
        if let Some(is_new) = filters.is_new {
            condition = condition.add(product::Column::IsNew.eq(is_new));
        }

        let mut query = product::Entity::find().filter(condition);
        query = match filters.sort.as_deref() {
            Some("price_asc") => query.order_by_asc(product::Column::Price),
            Some("price_desc") => query.order_by_desc(product::Column::Price),
            Some("rating") => query.order_by_desc(product::Column::AverageRating),
            _ => query.order_by_desc(product::Column::CreatedAt),
        };

        let page = filters.page.unwrap_or(1).max(1);
        let paginator = query.paginate(&*self.db, PAGE_SIZE);
        let total = paginator.num_items().await?;
        let pages = paginator.num_pages().await?;
        let products = paginator.fetch_page(page - 1).await?;
        Ok(ProductPage {
            products,
            page,
            pages,
            total,
        })
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let found = product::Entity::find_by_id(product_id)
            .find_also_related(category::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product".to_string()))?;
        let ratings = product_rating::Entity::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .order_by_desc(product_rating::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(ProductDetail {
            product: found.0,
            category: found.1,
            ratings,
        })
    }

    pub async fn featured(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .filter(product::Column::Featured.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .limit(COLLECTION_LIMIT)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn new_arrivals(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .filter(product::Column::IsNew.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .limit(COLLECTION_LIMIT)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn on_sale(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .filter(product::Column::Discount.gt(0))
            .order_by_desc(product::Column::Discount)
            .limit(COLLECTION_LIMIT)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn bestsellers(&self) -> Result<Vec<product::Model>, ServiceError> {
        product::Entity::find()
            .order_by_desc(product::Column::AverageRating)
            .order_by_desc(product::Column::NumReviews)
            .limit(COLLECTION_LIMIT)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        category::Entity::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category".to_string()))?;

        let id = Uuid::new_v4();
        let slug = self.unique_slug(&input.name, id).await?;
        let created = product::ActiveModel {
            id: Set(id),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            category_id: Set(input.category_id),
            price: Set(input.price),
            discount: Set(input.discount),
            stock: Set(input.stock),
            images: Set(serde_json::json!(input.images)),
            specifications: Set(input.specifications),
            featured: Set(input.featured),
            is_new: Set(input.is_new),
            average_rating: Set(Decimal::ZERO),
            num_reviews: Set(0),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(%product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;

        let found = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product".to_string()))?;
        let mut active: product::ActiveModel = found.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category_id) = input.category_id {
            category::Entity::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Category".to_string()))?;
            active.category_id = Set(category_id);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(discount) = input.discount {
            active.discount = Set(discount);
        }
        if let Some(stock) = input.stock {
            active.stock = Set(stock);
        }
        if let Some(images) = input.images {
            active.images = Set(serde_json::json!(images));
        }
        if let Some(specifications) = input.specifications {
            active.specifications = Set(Some(specifications));
        }
        if let Some(featured) = input.featured {
            active.featured = Set(featured);
        }
        if let Some(is_new) = input.is_new {
            active.is_new = Set(is_new);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self), fields(%product_id))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let found = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product".to_string()))?;
        product_rating::Entity::delete_many()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        found.delete(&*self.db).await?;
        Ok(())
    }

    /// One review per user per product; the product's derived rating fields
    /// are recomputed from the full rating set on every write.
    #[instrument(skip(self, reviewer, input), fields(%product_id))]
    pub async fn add_review(
        &self,
        product_id: Uuid,
        reviewer: &AuthUser,
        reviewer_name: String,
        input: ReviewInput,
    ) -> Result<product_rating::Model, ServiceError> {
        input.validate()?;

        let found = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product".to_string()))?;

        let existing = product_rating::Entity::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .filter(product_rating::Column::UserId.eq(reviewer.user_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Product already reviewed".to_string(),
            ));
        }

        let created = product_rating::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(reviewer.user_id),
            user_name: Set(reviewer_name),
            rating: Set(input.rating),
            review: Set(input.review),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        let all = product_rating::Entity::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;
        let count = all.len() as i32;
        let sum: i32 = all.iter().map(|r| r.rating).sum();
        let average = (Decimal::from(sum) / Decimal::from(count)).round_dp(1);

        let mut active: product::ActiveModel = found.into();
        active.average_rating = Set(average);
        active.num_reviews = Set(count);
        active.update(&*self.db).await?;

        self.event_sender
            .send(Event::ProductReviewed {
                product_id,
                user_id: reviewer.user_id,
                rating: created.rating,
            })
            .await;
        Ok(created)
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category".to_string()))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(input.name.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Category already exists".to_string(),
            ));
        }

        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            image: Set(input.image),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?)
    }

    #[instrument(skip(self, input), fields(%category_id))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;

        let found = self.get_category(category_id).await?;
        let mut active: category::ActiveModel = found.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(image) = input.image {
            active.image = Set(Some(image));
        }
        Ok(active.update(&*self.db).await?)
    }

    /// Deleting a category still referenced by products is rejected so no
    /// product is left pointing at a missing category.
    #[instrument(skip(self), fields(%category_id))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let found = self.get_category(category_id).await?;
        let in_use = product::Entity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::ValidationError(
                "Category still has products".to_string(),
            ));
        }
        found.delete(&*self.db).await?;
        Ok(())
    }

    async fn unique_slug(&self, name: &str, id: Uuid) -> Result<String, ServiceError> {
        let base = slugify(name);
        let taken = product::Entity::find()
            .filter(product::Column::Slug.eq(base.clone()))
            .one(&*self.db)
            .await?
            .is_some();
        if !taken {
            return Ok(base);
        }
        // Disambiguate with a stable fragment of the product id.
        let mut suffix = id.simple().to_string();
        suffix.truncate(8);
        Ok(format!("{base}-{suffix}"))
    }
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Wireless Mouse (v2)"), "wireless-mouse-v2");
        assert_eq!(slugify("  Café au Lait  "), "caf-au-lait");
        assert_eq!(slugify("plain"), "plain");
    }
}
