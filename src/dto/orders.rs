use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    models::{Order, PaymentMethod, ShippingAddress},
    pricing::DeliveryOption,
};

/// A cart line as submitted by the client. `price` is taken as-is from the
/// client cart and read leniently; see [`crate::pricing::sanitize_price`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product: String,
    pub name: String,
    #[serde(default)]
    pub qty: Option<u32>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub price: Value,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    pub protection: bool,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    /// Total the client showed the shopper. Only used to flag drift; never charged.
    #[serde(default)]
    pub expected_total: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
