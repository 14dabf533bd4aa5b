use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    dto::{orders::CreateOrderRequest, payments::PaymentSessionRequest},
    models::PaymentMethod,
    pricing::{self, DeliveryOption, Promo, Totals},
};

use super::{address::AddressForm, cart::Cart};

/// Result of pressing "apply" on the promo field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoOutcome {
    Applied(Promo),
    Removed,
    Invalid,
}

impl PromoOutcome {
    pub fn message(self) -> &'static str {
        match self {
            PromoOutcome::Applied(promo) => promo.applied_message(),
            PromoOutcome::Removed => "Promo removed.",
            PromoOutcome::Invalid => "Invalid promo code.",
        }
    }
}

/// Everything the shopper chooses on the checkout page besides the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutForm {
    pub address: AddressForm,
    pub delivery_option: DeliveryOption,
    pub protection: bool,
    pub notes: String,
    pub payment_method: PaymentMethod,
    active_promo: Option<Promo>,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            address: AddressForm::default(),
            delivery_option: DeliveryOption::Standard,
            protection: true,
            notes: String::new(),
            payment_method: PaymentMethod::Online,
            active_promo: None,
        }
    }
}

impl CheckoutForm {
    pub fn active_promo(&self) -> Option<Promo> {
        self.active_promo
    }

    /// A blank code clears the promo; an unknown one clears it too and says so.
    pub fn apply_promo(&mut self, raw: &str) -> PromoOutcome {
        if raw.trim().is_empty() {
            self.active_promo = None;
            return PromoOutcome::Removed;
        }
        match Promo::parse(raw) {
            Some(promo) => {
                self.active_promo = Some(promo);
                PromoOutcome::Applied(promo)
            }
            None => {
                self.active_promo = None;
                PromoOutcome::Invalid
            }
        }
    }

    /// Display totals. The server recomputes these and its figures win.
    pub fn preview(&self, cart: &Cart) -> Totals {
        pricing::compute_totals(
            &cart.priced_lines(),
            self.delivery_option,
            self.protection,
            self.active_promo.map(Promo::code),
        )
    }

    pub fn estimated_delivery(&self, today: NaiveDate) -> NaiveDate {
        self.delivery_option.estimated_delivery(today)
    }

    pub fn order_request(&self, cart: &Cart, expected_total: Decimal) -> CreateOrderRequest {
        let notes = self.notes.trim();
        CreateOrderRequest {
            order_items: cart.order_items(),
            shipping_address: self.address.to_shipping_address(),
            payment_method: self.payment_method,
            promo_code: self.active_promo.map(|p| p.code().to_string()),
            delivery_option: self.delivery_option,
            protection: self.protection,
            delivery_notes: (!notes.is_empty()).then(|| notes.to_string()),
            expected_total: Some(expected_total),
        }
    }

    pub fn session_request(&self, order_id: uuid::Uuid) -> PaymentSessionRequest {
        let field = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        PaymentSessionRequest {
            order_id: Some(order_id),
            customer_name: field(&self.address.full_name),
            customer_email: field(&self.address.email),
            customer_phone: field(&self.address.phone),
        }
    }
}
