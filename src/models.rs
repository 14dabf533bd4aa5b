use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::pricing::{DeliveryOption, Promo};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    Cod,
    #[default]
    #[serde(rename = "Online", alias = "Cashfree")]
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Online => "Online",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "COD" => Some(PaymentMethod::Cod),
            "Online" | "Cashfree" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

/// A line item as captured on the order. Copied by value at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product: String,
    pub name: String,
    pub qty: u32,
    pub price: Decimal,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentResult {
    /// Gateway transaction id.
    pub id: String,
    pub status: String,
    pub update_time: DateTime<Utc>,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<Promo>,
    pub delivery_option: DeliveryOption,
    pub delivery_notes: Option<String>,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub protection_price: Decimal,
    pub discount_price: Decimal,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
