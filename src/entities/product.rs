use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog item. `average_rating` and `num_reviews` are derived from
/// `product_ratings` rows and recomputed whenever a review is submitted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    /// Percentage off the list price, 0 to 100.
    pub discount: i32,
    pub stock: i32,
    /// JSON array of image URLs, first entry is the display image.
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    /// JSON array of `{name, value}` pairs.
    #[sea_orm(column_type = "Json", nullable)]
    pub specifications: Option<Json>,
    pub featured: bool,
    pub is_new: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub average_rating: Decimal,
    pub num_reviews: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::product_rating::Entity")]
    Ratings,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// List price with the discount percentage applied.
    pub fn discounted_price(&self) -> Decimal {
        self.price - self.price * Decimal::from(self.discount) / Decimal::from(100)
    }

    /// First image URL, if any.
    pub fn display_image(&self) -> Option<String> {
        self.images
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, discount: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            slug: "widget".into(),
            description: String::new(),
            category_id: Uuid::new_v4(),
            price,
            discount,
            stock: 5,
            images: serde_json::json!(["https://img.example/1.png"]),
            specifications: None,
            featured: false,
            is_new: false,
            average_rating: Decimal::ZERO,
            num_reviews: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn discount_applies_as_percentage() {
        assert_eq!(product(dec!(200.00), 25).discounted_price(), dec!(150.00));
        assert_eq!(product(dec!(99.99), 0).discounted_price(), dec!(99.99));
    }

    #[test]
    fn display_image_takes_first_entry() {
        assert_eq!(
            product(dec!(1), 0).display_image().as_deref(),
            Some("https://img.example/1.png")
        );
    }
}
