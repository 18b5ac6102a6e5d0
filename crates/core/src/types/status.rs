//! Status and category enums.
//!
//! The enums backed by Postgres enum types derive `sqlx::Type` under the
//! `postgres` feature. Wire and database spellings are both `snake_case`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Implements `Display`, `FromStr` and `ALL` for a unit enum from a
/// variant-to-string table.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` spelling used on the wire and in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant::new($kind, other)),
                }
            }
        }
    };
}

/// Order lifecycle status.
///
/// The happy path is linear (`pending` → `confirmed` → `processing` →
/// `shipped` → `delivered`); `cancelled` can be reached from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// The linear fulfilment path shown on tracking timelines.
    pub const PROGRESSION: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Terminal orders accept no further status changes.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses a customer may cancel from.
    pub const CUSTOMER_CANCELLABLE: [Self; 3] =
        [Self::Pending, Self::Confirmed, Self::Processing];

    /// Customers may cancel until the parcel leaves the warehouse.
    #[must_use]
    pub const fn customer_can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing)
    }

    /// Position on the linear path, `None` for `cancelled`.
    #[must_use]
    pub fn progression_index(&self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| s == self)
    }

    /// Human-readable description for tracking views.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Pending => "Order is being reviewed",
            Self::Confirmed => "Order has been confirmed",
            Self::Processing => "Order is being prepared",
            Self::Shipped => "Order has been shipped",
            Self::Delivered => "Order has been delivered",
            Self::Cancelled => "Order has been cancelled",
        }
    }
}

/// Courier-side delivery progress, tracked independently of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
}

string_enum!(DeliveryStatus, "delivery status", {
    Pending => "pending",
    Assigned => "assigned",
    PickedUp => "picked_up",
    InTransit => "in_transit",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Failed => "failed",
});

/// How the customer pays. Cash on delivery when the client does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    Card,
    Upi,
}

string_enum!(PaymentMethod, "payment method", {
    Cod => "cod",
    Card => "card",
    Upi => "upi",
});

/// Catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Saree,
    Earrings,
}

string_enum!(ProductCategory, "category", {
    Saree => "saree",
    Earrings => "earrings",
});

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

string_enum!(UserRole, "role", {
    User => "user",
    Admin => "admin",
});

/// Who changed an order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    Customer,
    Admin,
}

string_enum!(Actor, "actor", {
    System => "system",
    Customer => "customer",
    Admin => "admin",
});

/// Back-office notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    LowStock,
    OrderCancelled,
    PaymentReceived,
}

string_enum!(NotificationKind, "notification type", {
    NewOrder => "new_order",
    LowStock => "low_stock",
    OrderCancelled => "order_cancelled",
    PaymentReceived => "payment_received",
});
