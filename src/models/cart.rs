use crate::entities::product::{self, ProductCategory};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// One product line in the session cart. Name and unit price are
/// snapshotted when the line is first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub key: String,
    pub type_tag: ProductCategory,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl CartLine {
    fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
        self.subtotal = line_subtotal(self.unit_price, quantity);
    }
}

pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    (unit_price * Decimal::from(quantity)).round_dp(2)
}

/// Session-held shopping cart keyed by `"{type_tag}_{product_id}"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: BTreeMap<String, CartLine>,
}

impl Cart {
    pub fn line_key(category: ProductCategory, product_id: Uuid) -> String {
        format!("{}_{}", category.tag(), product_id)
    }

    /// Adds `quantity` units of `product`, merging into an existing line.
    /// Quantities below one count as one.
    pub fn add(&mut self, product: &product::Model, quantity: i32) -> &CartLine {
        let quantity = quantity.max(1);
        let key = Self::line_key(product.category, product.id);

        let line = self
            .lines
            .entry(key.clone())
            .and_modify(|line| {
                let merged = line.quantity.saturating_add(quantity);
                line.set_quantity(merged);
            })
            .or_insert_with(|| CartLine {
                key,
                type_tag: product.category,
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
                subtotal: line_subtotal(product.price, quantity),
            });
        line
    }

    /// Overwrites the quantity of an existing line.
    pub fn update(&mut self, key: &str, quantity: i32) -> Result<&CartLine, ServiceError> {
        let line = self
            .lines
            .get_mut(key)
            .ok_or_else(|| ServiceError::not_found("Cart line", key))?;
        line.set_quantity(quantity);
        Ok(line)
    }

    pub fn remove(&mut self, key: &str) -> Result<CartLine, ServiceError> {
        self.lines
            .remove(key)
            .ok_or_else(|| ServiceError::not_found("Cart line", key))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn get(&self, key: &str) -> Option<&CartLine> {
        self.lines.get(key)
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn item_count(&self) -> i64 {
        self.lines.values().map(|l| i64::from(l.quantity)).sum()
    }

    pub fn total(&self) -> Decimal {
        self.lines.values().map(|l| l.subtotal).sum()
    }

    pub fn view(&self) -> CartView {
        CartView {
            lines: self.lines.values().cloned().collect(),
            item_count: self.item_count(),
            total: self.total(),
        }
    }
}

/// Serialized shape of the cart returned by the cart endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn product(category: ProductCategory, price: Decimal) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            category,
            code: "P-1".into(),
            name: "Chew toy".into(),
            brand: None,
            price,
            stock: 10,
            description: None,
            attributes: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn adding_same_product_twice_merges_lines() {
        let toy = product(ProductCategory::Toy, dec!(4.99));
        let mut cart = Cart::default();

        cart.add(&toy, 1);
        let line = cart.add(&toy, 2).clone();

        assert_eq!(cart.len(), 1);
        assert_eq!(line.quantity, 3);
        assert_eq!(line.subtotal, dec!(14.97));
        assert_eq!(line.key, format!("juguete_{}", toy.id));
    }

    #[test]
    fn non_positive_quantity_is_clamped_on_add() {
        let food = product(ProductCategory::DogFoodAdult, dec!(30.00));
        let mut cart = Cart::default();

        assert_eq!(cart.add(&food, 0).quantity, 1);
        assert_eq!(cart.add(&food, -5).quantity, 2);
    }

    #[test]
    fn same_id_under_different_tags_are_distinct_lines() {
        let mut a = product(ProductCategory::Collar, dec!(10));
        let mut b = a.clone();
        b.category = ProductCategory::Bed;
        a.name = "Collar".into();

        let mut cart = Cart::default();
        cart.add(&a, 1);
        cart.add(&b, 1);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn update_overwrites_quantity_and_subtotal() {
        let med = product(ProductCategory::Medication, dec!(2.50));
        let mut cart = Cart::default();
        let key = cart.add(&med, 4).key.clone();

        let line = cart.update(&key, 2).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.subtotal, dec!(5.00));
        assert_eq!(cart.total(), dec!(5.00));
    }

    #[test]
    fn unknown_keys_are_not_found() {
        let mut cart = Cart::default();
        assert_matches!(cart.update("pa_missing", 1), Err(ServiceError::NotFound(_)));
        assert_matches!(cart.remove("pa_missing"), Err(ServiceError::NotFound(_)));
    }

    #[test]
    fn view_reports_total_and_item_count() {
        let mut cart = Cart::default();
        cart.add(&product(ProductCategory::CatSnack, dec!(1.25)), 4);
        cart.add(&product(ProductCategory::Shampoo, dec!(8.40)), 1);

        let view = cart.view();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.total, dec!(13.40));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn subtotal_tracks_price_times_quantity(
            cents in 1i64..100_000,
            first in 1i32..50,
            second in 1i32..50,
            replacement in 0i32..100,
        ) {
            let price = Decimal::new(cents, 2);
            let p = product(ProductCategory::General, price);
            let mut cart = Cart::default();

            cart.add(&p, first);
            let line = cart.add(&p, second).clone();
            prop_assert_eq!(line.subtotal, (price * Decimal::from(first + second)).round_dp(2));

            let line = cart.update(&line.key, replacement).unwrap().clone();
            prop_assert_eq!(line.subtotal, (price * Decimal::from(replacement)).round_dp(2));
            prop_assert_eq!(cart.total(), line.subtotal);
        }
    }
}
