//! Order pricing.
//!
//! The checkout preview and the total persisted on an order are both produced
//! by [`compute_totals`]. It is a pure function of its inputs; the server-side
//! evaluation is the one that gets charged.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Every amount in the store is expressed in this currency.
pub const CURRENCY: &str = "INR";

pub const EXPRESS_SHIPPING_FEE: Decimal = dec!(99);
pub const PROTECTION_FEE: Decimal = dec!(29);
pub const SPRINT10_RATE: Decimal = dec!(0.10);
pub const SPRINT10_CAP: Decimal = dec!(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    #[default]
    Standard,
    Express,
}

impl DeliveryOption {
    pub fn shipping_fee(self) -> Decimal {
        match self {
            DeliveryOption::Standard => Decimal::ZERO,
            DeliveryOption::Express => EXPRESS_SHIPPING_FEE,
        }
    }

    pub fn transit_days(self) -> u64 {
        match self {
            DeliveryOption::Standard => 5,
            DeliveryOption::Express => 2,
        }
    }

    /// Date the parcel is expected to arrive when ordered on `ordered_on`.
    pub fn estimated_delivery(self, ordered_on: NaiveDate) -> NaiveDate {
        ordered_on
            .checked_add_days(Days::new(self.transit_days()))
            .unwrap_or(ordered_on)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOption::Standard => "standard",
            DeliveryOption::Express => "express",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(DeliveryOption::Standard),
            "express" => Some(DeliveryOption::Express),
            _ => None,
        }
    }
}

/// The fixed promo table. Codes are matched case-insensitively after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Promo {
    #[serde(rename = "SPRINT10")]
    Sprint10,
    #[serde(rename = "SHIPFREE")]
    ShipFree,
}

impl Promo {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "SPRINT10" => Some(Promo::Sprint10),
            "SHIPFREE" => Some(Promo::ShipFree),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Promo::Sprint10 => "SPRINT10",
            Promo::ShipFree => "SHIPFREE",
        }
    }

    /// Message shown to the shopper once the code is accepted.
    pub fn applied_message(self) -> &'static str {
        match self {
            Promo::Sprint10 => "SPRINT10 applied. Save 10% up to 500.",
            Promo::ShipFree => "SHIPFREE applied. Shipping fee waived.",
        }
    }

    pub fn discount(self, items_price: Decimal, shipping_price: Decimal) -> Decimal {
        match self {
            Promo::Sprint10 => round_money(items_price.saturating_mul(SPRINT10_RATE)).min(SPRINT10_CAP),
            Promo::ShipFree => shipping_price,
        }
    }
}

/// One priced cart or order line. Construct through [`PricedLine::new`] so the
/// quantity is at least one and the price is never negative. Unit prices keep
/// their full precision; rounding to paise happens once, on the totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    unit_price: Decimal,
    quantity: u32,
}

impl PricedLine {
    pub fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price: unit_price.max(Decimal::ZERO),
            quantity: quantity.max(1),
        }
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub protection_price: Decimal,
    pub discount_price: Decimal,
    pub total_price: Decimal,
}

impl Totals {
    /// An order can only be created for a strictly positive total.
    pub fn is_chargeable(&self) -> bool {
        self.total_price > Decimal::ZERO
    }
}

/// Price a cart.
///
/// Unknown promo codes resolve to no discount rather than an error.
pub fn compute_totals(
    lines: &[PricedLine],
    delivery: DeliveryOption,
    protection: bool,
    promo_code: Option<&str>,
) -> Totals {
    let items_price = round_money(
        lines
            .iter()
            .fold(Decimal::ZERO, |sum, line| sum.saturating_add(line.line_total())),
    );

    let shipping_price = delivery.shipping_fee().max(Decimal::ZERO);
    let protection_price = (if protection { PROTECTION_FEE } else { Decimal::ZERO }).max(Decimal::ZERO);

    let discount_price = promo_code
        .and_then(Promo::parse)
        .map(|promo| promo.discount(items_price, shipping_price))
        .unwrap_or(Decimal::ZERO);

    let total_price = items_price
        .saturating_add(shipping_price)
        .saturating_add(protection_price)
        .saturating_sub(discount_price)
        .max(Decimal::ZERO);

    Totals {
        items_price,
        shipping_price,
        protection_price,
        discount_price,
        total_price,
    }
}

/// Read a unit price out of untyped upstream data. Anything that is not a
/// finite, non-negative number is priced at zero.
pub fn sanitize_price(raw: &Value) -> Decimal {
    let amount = match raw {
        Value::Number(number) => match number.as_i64() {
            Some(whole) => Decimal::from(whole),
            None => number.as_f64().map(sanitize_f64).unwrap_or(Decimal::ZERO),
        },
        Value::String(text) => {
            let text = text.trim();
            Decimal::from_str(text)
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(sanitize_f64))
                .unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    };
    amount.max(Decimal::ZERO)
}

pub fn sanitize_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Amounts are stored as integer paise.
pub fn to_minor(amount: Decimal) -> Option<i64> {
    round_money(amount).checked_mul(dec!(100))?.to_i64()
}

pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
