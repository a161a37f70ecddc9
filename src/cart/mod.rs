//! Client-held cart. Nothing here touches the server until checkout; the
//! cart lives in whatever [`CartStorage`] adapter the embedding client
//! injects, serialized as a JSON snapshot.

pub mod flow;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::order::ShippingAddress;
use crate::entities::product;
use crate::services::orders::{CreateOrderInput, OrderItemInput};

const TAX_RATE: Decimal = dec!(0.10);
const SHIPPING_FLAT: Decimal = dec!(15.00);

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("cart storage error: {0}")]
    Storage(String),
    #[error("cart snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Persistence seam for the cart snapshot. A browser client backs this with
/// local storage; tests use [`InMemoryStorage`].
pub trait CartStorage: Send {
    fn load(&self) -> Result<Option<String>, CartError>;
    fn save(&mut self, snapshot: &str) -> Result<(), CartError>;
    fn clear(&mut self) -> Result<(), CartError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    snapshot: Option<String>,
}

impl CartStorage for InMemoryStorage {
    fn load(&self) -> Result<Option<String>, CartError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &str) -> Result<(), CartError> {
        self.snapshot = Some(snapshot.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CartError> {
        self.snapshot = None;
        Ok(())
    }
}

/// One cart line. `unit_price` is the discounted price captured at add time;
/// `stock` is the quantity ceiling cached from the last catalog sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

pub struct CartStore {
    items: Vec<CartItem>,
    storage: Box<dyn CartStorage>,
}

impl CartStore {
    /// Rebuilds the cart from the adapter's snapshot. A corrupt snapshot is
    /// discarded rather than surfaced; the user just sees an empty cart.
    pub fn load(storage: Box<dyn CartStorage>) -> Self {
        let items = storage
            .load()
            .ok()
            .flatten()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { items, storage }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a product at its current discounted price. Quantities merge with
    /// any existing line and are clamped to `[1, stock]`.
    pub fn add(&mut self, product: &product::Model, quantity: i32) -> Result<(), CartError> {
        let requested = quantity.max(1);
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(line) => {
                line.quantity = (line.quantity + requested).clamp(1, product.stock.max(1));
                line.unit_price = product.discounted_price();
                line.stock = product.stock;
            }
            None => self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.discounted_price(),
                quantity: requested.clamp(1, product.stock.max(1)),
                image: product.display_image(),
                stock: product.stock,
            }),
        }
        self.persist()
    }

    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) -> Result<(), CartError> {
        if let Some(line) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            line.quantity = quantity.clamp(1, line.stock.max(1));
        }
        self.persist()
    }

    pub fn remove(&mut self, product_id: Uuid) -> Result<(), CartError> {
        self.items.retain(|i| i.product_id != product_id);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.items.clear();
        self.storage.clear()
    }

    /// Syncs lines against live catalog data: vanished products are dropped,
    /// price, stock and image are refreshed, quantities re-clamped.
    pub fn rehydrate(&mut self, live: &[product::Model]) -> Result<(), CartError> {
        self.items.retain_mut(|line| {
            let Some(current) = live.iter().find(|p| p.id == line.product_id) else {
                return false;
            };
            line.name = current.name.clone();
            line.unit_price = current.discounted_price();
            line.image = current.display_image();
            line.stock = current.stock;
            line.quantity = line.quantity.clamp(1, current.stock.max(1));
            current.stock > 0
        });
        self.persist()
    }

    /// Subtotal plus 10% tax plus a flat shipping charge.
    pub fn totals(&self) -> CartTotals {
        let items_price: Decimal = self
            .items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let tax_price = (items_price * TAX_RATE).round_dp(2);
        let shipping_price = if self.items.is_empty() {
            Decimal::ZERO
        } else {
            SHIPPING_FLAT
        };
        CartTotals {
            items_price,
            tax_price,
            shipping_price,
            total_price: items_price + tax_price + shipping_price,
        }
    }

    /// Produces the checkout request for the current cart contents.
    pub fn to_order_input(
        &self,
        shipping_address: ShippingAddress,
        payment_method: String,
    ) -> CreateOrderInput {
        let totals = self.totals();
        CreateOrderInput {
            items: self
                .items
                .iter()
                .map(|i| OrderItemInput {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
            shipping_address,
            payment_method,
            items_price: totals.items_price,
            tax_price: totals.tax_price,
            shipping_price: totals.shipping_price,
            total_price: totals.total_price,
        }
    }

    fn persist(&mut self) -> Result<(), CartError> {
        let snapshot = serde_json::to_string(&self.items)?;
        self.storage.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_product(price: Decimal, discount: i32, stock: i32) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Keyboard".into(),
            slug: "keyboard".into(),
            description: String::new(),
            category_id: Uuid::new_v4(),
            price,
            discount,
            stock,
            images: serde_json::json!(["https://img.example/kb.png"]),
            specifications: None,
            featured: false,
            is_new: false,
            average_rating: Decimal::ZERO,
            num_reviews: 0,
            created_at: Utc::now(),
        }
    }

    fn empty_cart() -> CartStore {
        CartStore::load(Box::new(InMemoryStorage::default()))
    }

    #[test]
    fn totals_follow_the_checkout_formula() {
        let mut cart = empty_cart();
        cart.add(&sample_product(dec!(50.00), 0, 10), 2).unwrap();
        let totals = cart.totals();
        assert_eq!(totals.items_price, dec!(100.00));
        assert_eq!(totals.tax_price, dec!(10.00));
        assert_eq!(totals.shipping_price, dec!(15.00));
        assert_eq!(totals.total_price, dec!(125.00));
    }

    #[test]
    fn discount_is_captured_at_add_time() {
        let mut cart = empty_cart();
        cart.add(&sample_product(dec!(200.00), 25, 10), 1).unwrap();
        assert_eq!(cart.items()[0].unit_price, dec!(150.00));
    }

    #[test]
    fn quantity_is_clamped_to_stock() {
        let mut cart = empty_cart();
        let p = sample_product(dec!(10.00), 0, 3);
        cart.add(&p, 99).unwrap();
        assert_eq!(cart.items()[0].quantity, 3);
        cart.add(&p, 1).unwrap();
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn cart_round_trips_through_storage() {
        let mut storage = InMemoryStorage::default();
        {
            let mut cart = CartStore {
                items: Vec::new(),
                storage: Box::new(InMemoryStorage::default()),
            };
            cart.add(&sample_product(dec!(10.00), 0, 5), 2).unwrap();
            storage.save(&serde_json::to_string(cart.items()).unwrap()).unwrap();
        }
        let cart = CartStore::load(Box::new(storage));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn corrupt_snapshot_yields_empty_cart() {
        let mut storage = InMemoryStorage::default();
        storage.save("not json at all").unwrap();
        let cart = CartStore::load(Box::new(storage));
        assert!(cart.is_empty());
    }

    #[test]
    fn rehydrate_drops_vanished_and_out_of_stock_products() {
        let mut cart = empty_cart();
        let keep = sample_product(dec!(10.00), 0, 5);
        let gone = sample_product(dec!(20.00), 0, 5);
        let sold_out = sample_product(dec!(30.00), 0, 5);
        cart.add(&keep, 4).unwrap();
        cart.add(&gone, 1).unwrap();
        cart.add(&sold_out, 1).unwrap();

        let mut keep_live = keep.clone();
        keep_live.stock = 2;
        let mut sold_out_live = sold_out.clone();
        sold_out_live.stock = 0;
        cart.rehydrate(&[keep_live, sold_out_live]).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, keep.id);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn empty_cart_has_no_shipping_charge() {
        assert_eq!(empty_cart().totals().total_price, Decimal::ZERO);
    }
}
