//! Customer account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alankree_core::{AddressId, Email, UserId, UserRole};

use super::order::ShippingAddress;
use super::product::Product;

/// A customer account (registered or guest-checkout record).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: UserRole,
    /// False for records created by guest checkout.
    pub is_registered: bool,
    pub is_active: bool,
    pub preferences: serde_json::Value,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub is_default: bool,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            street: address.street.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            country: address.country.clone(),
        }
    }
}

/// Address fields submitted by the customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Trim every field and fill in the default country.
    ///
    /// Returns `None` when a required line is blank.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let trimmed = |s: String| s.trim().to_owned();
        let normalized = Self {
            street: trimmed(self.street),
            city: trimmed(self.city),
            state: trimmed(self.state),
            pincode: trimmed(self.pincode),
            country: Some(
                self.country
                    .map(trimmed)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "India".to_string()),
            ),
            is_default: self.is_default,
        };
        let complete = [
            &normalized.street,
            &normalized.city,
            &normalized.state,
            &normalized.pincode,
        ]
        .iter()
        .all(|part| !part.is_empty());
        complete.then_some(normalized)
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Product,
    pub quantity: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_fills_country() {
        let input: AddressInput = serde_json::from_value(serde_json::json!({
            "street": " 4 Park Street ",
            "city": "Kolkata",
            "state": "West Bengal",
            "pincode": "700016"
        }))
        .unwrap();
        let normalized = input.normalized().unwrap();
        assert_eq!(normalized.street, "4 Park Street");
        assert_eq!(normalized.country.as_deref(), Some("India"));
        assert!(!normalized.is_default);
    }

    #[test]
    fn test_normalized_rejects_blank_lines() {
        let input = AddressInput {
            street: "4 Park Street".to_string(),
            city: "  ".to_string(),
            state: "West Bengal".to_string(),
            pincode: "700016".to_string(),
            country: None,
            is_default: true,
        };
        assert!(input.normalized().is_none());
    }

    #[test]
    fn test_address_to_shipping_address() {
        let address = Address {
            id: AddressId::new(3),
            street: "4 Park Street".to_string(),
            city: "Kolkata".to_string(),
            state: "West Bengal".to_string(),
            pincode: "700016".to_string(),
            country: "India".to_string(),
            is_default: true,
        };
        let shipping = ShippingAddress::from(&address);
        assert!(shipping.is_complete());
        assert_eq!(shipping.city, "Kolkata");
    }
}
