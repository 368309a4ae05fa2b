//! Buyer form validation for checkout.
//!
//! [`CheckoutForm`] is the raw submission (form-encoded or JSON).
//! [`CheckoutForm::validate`] turns it into a [`BuyerInfo`] or reports every
//! failing field at once so the form can be re-displayed.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Email, Phone};

const MAX_NAME_LENGTH: usize = 255;
const MAX_ADDRESS_LENGTH: usize = 100;

/// Raw checkout submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub requires_delivery: bool,
    #[serde(default)]
    pub delivery_address: Option<String>,
}

/// Validated buyer and delivery data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Phone,
    pub requires_delivery: bool,
    /// Empty unless `requires_delivery` is set.
    pub delivery_address: String,
}

impl BuyerInfo {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Field name to error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error for one field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`, if any.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of all offending fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl CheckoutForm {
    /// Validate the submission.
    ///
    /// Names, email and phone are required. The delivery address is required
    /// when delivery is requested and discarded otherwise.
    ///
    /// # Errors
    ///
    /// Returns every failing field in a [`ValidationErrors`].
    pub fn validate(&self) -> Result<BuyerInfo, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let first_name = required_text(&mut errors, "first_name", &self.first_name, MAX_NAME_LENGTH);
        let last_name = required_text(&mut errors, "last_name", &self.last_name, MAX_NAME_LENGTH);

        let email = Email::parse(&self.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        let phone = Phone::parse(&self.phone)
            .map_err(|e| errors.add("phone", e.to_string()))
            .ok();

        let delivery_address = if self.requires_delivery {
            let address = self.delivery_address.as_deref().unwrap_or_default().trim();
            if address.is_empty() {
                errors.add(
                    "delivery_address",
                    "delivery address is required when delivery is requested",
                );
            } else if address.chars().count() > MAX_ADDRESS_LENGTH {
                errors.add(
                    "delivery_address",
                    format!("must be at most {MAX_ADDRESS_LENGTH} characters"),
                );
            }
            address.to_owned()
        } else {
            String::new()
        };

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(BuyerInfo {
                first_name,
                last_name,
                email,
                phone,
                requires_delivery: self.requires_delivery,
                delivery_address,
            }),
            _ => Err(errors),
        }
    }
}

fn required_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "this field is required");
    } else if value.chars().count() > max {
        errors.add(field, format!("must be at most {max} characters"));
    }
    value.to_owned()
}

/// Accept JSON booleans as well as HTML checkbox values (`on`, `true`, `1`).
///
/// # Errors
///
/// Fails only if the value is neither a boolean nor a string.
pub fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Checkbox {
        Bool(bool),
        Text(String),
    }

    Ok(match Checkbox::deserialize(deserializer)? {
        Checkbox::Bool(b) => b,
        Checkbox::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "on" | "true" | "1" | "yes"
        ),
    })
}
