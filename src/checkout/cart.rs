use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    dto::orders::OrderItemInput,
    pricing::{self, PricedLine},
};

pub const MIN_QTY: u32 = 1;
pub const MAX_QTY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_qty")]
    pub qty: u32,
}

fn default_qty() -> u32 {
    MIN_QTY
}

impl CartItem {
    pub fn new(
        product: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        image: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            name: name.into(),
            price,
            image: image.into(),
            qty: MIN_QTY,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.priced().line_total()
    }

    fn priced(&self) -> PricedLine {
        PricedLine::new(self.price, self.qty)
    }
}

/// Shopper's cart, kept entirely on the client until checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product: &str) -> Option<usize> {
        self.items.iter().position(|item| item.product == product)
    }

    /// Adds one unit. A product already in the cart has its quantity bumped.
    /// Items without a product reference are ignored.
    pub fn add(&mut self, item: CartItem) -> bool {
        if item.product.trim().is_empty() {
            return false;
        }
        match self.position(&item.product) {
            Some(idx) => {
                let existing = &mut self.items[idx];
                existing.qty = (existing.qty + 1).min(MAX_QTY);
            }
            None => self.items.push(CartItem {
                qty: MIN_QTY,
                ..item
            }),
        }
        true
    }

    pub fn remove(&mut self, product: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product != product);
        self.items.len() != before
    }

    /// Takes one unit off; the line goes away when it was the last unit.
    pub fn decrement(&mut self, product: &str) -> bool {
        let Some(idx) = self.position(product) else {
            return false;
        };
        if self.items[idx].qty <= MIN_QTY {
            self.items.remove(idx);
        } else {
            self.items[idx].qty -= 1;
        }
        true
    }

    pub fn update_qty(&mut self, product: &str, qty: u32) -> bool {
        match self.position(product) {
            Some(idx) => {
                self.items[idx].qty = qty.clamp(MIN_QTY, MAX_QTY);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |sum, item| sum.saturating_add(item.qty.max(MIN_QTY)))
    }

    pub fn subtotal(&self) -> Decimal {
        pricing::round_money(
            self.items
                .iter()
                .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.line_total())),
        )
    }

    pub fn priced_lines(&self) -> Vec<PricedLine> {
        self.items.iter().map(CartItem::priced).collect()
    }

    /// First problem that would stop the server from accepting these lines.
    pub fn item_problem(&self) -> Option<&'static str> {
        if self.items.iter().any(|item| item.image.trim().is_empty()) {
            return Some("One or more items are missing an image.");
        }
        if self.items.iter().any(|item| item.product.trim().is_empty()) {
            return Some("One or more items are missing product IDs.");
        }
        None
    }

    pub fn order_items(&self) -> Vec<OrderItemInput> {
        self.items
            .iter()
            .map(|item| OrderItemInput {
                product: item.product.clone(),
                name: item.name.clone(),
                qty: Some(item.qty.max(MIN_QTY)),
                price: serde_json::Value::String(item.price.to_string()),
                image: item.image.clone(),
            })
            .collect()
    }
}
