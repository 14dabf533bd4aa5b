use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::ShippingAddress;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid regex"));
static PIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("valid regex"));
static DOMESTIC_PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").expect("valid regex"));

const DOMESTIC_COUNTRY: &str = "india";
const MIN_FOREIGN_POSTAL_LEN: usize = 4;
const MIN_FOREIGN_PHONE_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    FullName,
    Email,
    Phone,
    AddressLine1,
    City,
    State,
    PostalCode,
    Country,
}

/// Per-field messages, ready to render next to the inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<AddressField, &'static str>);

impl FieldErrors {
    fn set(&mut self, field: AddressField, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn get(&self, field: AddressField) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = AddressField> + '_ {
        self.0.keys().copied()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Please fix the highlighted fields.")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub landmark: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Default for AddressForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address_line1: String::new(),
            address_line2: String::new(),
            landmark: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            country: "India".to_string(),
        }
    }
}

impl AddressForm {
    pub fn is_domestic(&self) -> bool {
        self.country.trim().eq_ignore_ascii_case(DOMESTIC_COUNTRY)
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        let required = [
            (AddressField::FullName, &self.full_name, "Full name is required."),
            (AddressField::Email, &self.email, "Email is required."),
            (AddressField::AddressLine1, &self.address_line1, "Address line 1 is required."),
            (AddressField::City, &self.city, "City is required."),
            (AddressField::State, &self.state, "State is required."),
            (AddressField::PostalCode, &self.postal_code, "Postal code is required."),
            (AddressField::Country, &self.country, "Country is required."),
            (AddressField::Phone, &self.phone, "Phone is required."),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.set(field, message);
            }
        }

        let email = self.email.trim();
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            errors.set(AddressField::Email, "Enter a valid email address.");
        }

        let postal = self.postal_code.trim();
        let phone = self.phone.trim();
        if self.is_domestic() {
            if !postal.is_empty() && !PIN_RE.is_match(postal) {
                errors.set(AddressField::PostalCode, "Enter a 6 digit PIN code.");
            }
            if !phone.is_empty() && !DOMESTIC_PHONE_RE.is_match(phone) {
                errors.set(AddressField::Phone, "Enter a 10 digit phone number.");
            }
        } else {
            if !postal.is_empty() && postal.chars().count() < MIN_FOREIGN_POSTAL_LEN {
                errors.set(AddressField::PostalCode, "Postal code looks too short.");
            }
            if !phone.is_empty() && phone.chars().count() < MIN_FOREIGN_PHONE_LEN {
                errors.set(AddressField::Phone, "Phone number looks too short.");
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Address lines, then landmark, joined with ", " and blanks skipped.
    pub fn street(&self) -> String {
        [&self.address_line1, &self.address_line2, &self.landmark]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_shipping_address(&self) -> ShippingAddress {
        ShippingAddress {
            name: self.full_name.trim().to_string(),
            address: self.street(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domestic() -> AddressForm {
        AddressForm {
            full_name: "Asha Rao".into(),
            email: "asha@example.in".into(),
            phone: "9876543210".into(),
            address_line1: "12 MG Road".into(),
            address_line2: "Flat 4B".into(),
            landmark: " ".into(),
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "India".into(),
        }
    }

    #[test]
    fn accepts_valid_domestic_address() {
        assert!(domestic().validate().is_ok());
    }

    #[test]
    fn domestic_pin_and_phone_are_strict() {
        let form = AddressForm {
            postal_code: "41100".into(),
            phone: "98765".into(),
            country: " INDIA ".into(),
            ..domestic()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get(AddressField::PostalCode),
            Some("Enter a 6 digit PIN code.")
        );
        assert_eq!(
            errors.get(AddressField::Phone),
            Some("Enter a 10 digit phone number.")
        );
    }

    #[test]
    fn international_rules_only_check_length() {
        let form = AddressForm {
            postal_code: "SW1A 1AA".into(),
            phone: "+44 20 7946 0958".into(),
            country: "United Kingdom".into(),
            ..domestic()
        };
        assert!(form.validate().is_ok());

        let short = AddressForm {
            postal_code: "123".into(),
            phone: "12345".into(),
            ..form
        };
        let errors = short.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn blank_form_reports_every_required_field() {
        let errors = AddressForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 7);
        assert!(errors.get(AddressField::Country).is_none());
    }

    #[test]
    fn bad_email_is_flagged() {
        let form = AddressForm {
            email: "asha at example".into(),
            ..domestic()
        };
        assert_eq!(
            form.validate().unwrap_err().get(AddressField::Email),
            Some("Enter a valid email address.")
        );
    }

    #[test]
    fn field_errors_serialize_as_a_field_map() {
        let form = AddressForm {
            city: " ".into(),
            ..domestic()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "city": "City is required." })
        );
        assert_eq!(errors.to_string(), "Please fix the highlighted fields.");
    }

    #[test]
    fn street_skips_blank_lines() {
        assert_eq!(domestic().street(), "12 MG Road, Flat 4B");
        assert_eq!(domestic().to_shipping_address().postal_code, "411001");
    }
}
