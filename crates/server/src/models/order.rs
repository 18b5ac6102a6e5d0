//! Order types.
//!
//! An order is a snapshot: customer details, address and line items are
//! copied at checkout and never follow later edits to the account or catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alankree_core::{
    Actor, DeliveryStatus, Email, OrderId, OrderStatus, PaymentMethod, Price, PriceError,
    ProductId,
};

fn default_country() -> String {
    "India".to_string()
}

/// Postal address copied onto an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

impl ShippingAddress {
    /// Whether every line needed for delivery is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.state, &self.pincode]
            .iter()
            .all(|part| !part.trim().is_empty())
    }
}

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog product, absent for items that were never in the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: u32,
    /// Unit price at checkout.
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItem {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooLarge`] when the line does not fit a price.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.price.times(self.quantity)
    }
}

/// Payment gateway outcome reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl PaymentResult {
    /// Whether the gateway reported the payment as captured.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status.as_deref().is_some_and(|status| {
            ["paid", "completed", "succeeded"]
                .iter()
                .any(|s| status.eq_ignore_ascii_case(s))
        })
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    pub actor: Actor,
}

impl StatusChange {
    #[must_use]
    pub fn now(status: OrderStatus, note: Option<String>, actor: Actor) -> Self {
        Self {
            status,
            timestamp: Utc::now(),
            note,
            actor,
        }
    }
}

/// Courier assigned to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAgent {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub assigned_at: DateTime<Utc>,
}

/// Delivery tracking, maintained by the back office.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agent: Option<DeliveryAgent>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Customer snapshot stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: ShippingAddress,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub payment_result: Option<PaymentResult>,
    pub total_price: Price,
    pub order_status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub processing_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivery: Delivery,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One step of the tracking timeline shown in the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStep {
    pub status: String,
    pub title: String,
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub completed: bool,
    pub current: bool,
}

impl Order {
    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooLarge`] when a line or the total overflows.
    pub fn total_of(items: &[OrderItem]) -> Result<Price, PriceError> {
        items
            .iter()
            .try_fold(Price::ZERO, |total, item| total.checked_add(item.line_total()?))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the order was placed with this email.
    #[must_use]
    pub fn is_owned_by(&self, email: &Email) -> bool {
        &self.customer.email == email
    }

    /// When the order entered `status`, from the stamped columns or history.
    #[must_use]
    pub fn entered_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        let stamped = match status {
            OrderStatus::Pending => Some(self.created_at),
            OrderStatus::Confirmed => self.confirmed_at,
            OrderStatus::Processing => self.processing_at,
            OrderStatus::Shipped => self.shipped_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
        };
        stamped.or_else(|| {
            self.status_history
                .iter()
                .rev()
                .find(|change| change.status == status)
                .map(|change| change.timestamp)
        })
    }

    /// Build the tracking timeline.
    ///
    /// Always starts with `placed`. Reached fulfilment steps are completed;
    /// the next step is marked current. Cancelled orders list the steps they
    /// passed through and end with the cancellation.
    #[must_use]
    pub fn tracking_timeline(&self) -> Vec<TrackingStep> {
        let mut steps = vec![TrackingStep {
            status: "placed".to_string(),
            title: "Order Placed".to_string(),
            description: "Your order has been placed successfully".to_string(),
            timestamp: Some(self.created_at),
            completed: true,
            current: false,
        }];

        let step = |status: OrderStatus, completed: bool, current: bool| TrackingStep {
            status: status.to_string(),
            title: title_case(status.as_str()),
            description: status.description().to_string(),
            timestamp: if completed {
                self.entered_at(status).or(Some(self.updated_at))
            } else {
                None
            },
            completed,
            current,
        };

        let fulfilment = OrderStatus::PROGRESSION.iter().skip(1);

        if self.order_status == OrderStatus::Cancelled {
            steps.extend(
                fulfilment
                    .filter(|s| self.status_history.iter().any(|c| c.status == **s))
                    .map(|s| step(*s, true, false)),
            );
            steps.push(step(OrderStatus::Cancelled, true, true));
            return steps;
        }

        let reached = self.order_status.progression_index().unwrap_or(0);
        for (index, status) in fulfilment.enumerate() {
            let position = index + 1;
            if position <= reached {
                steps.push(step(*status, true, false));
            } else if position == reached + 1 {
                steps.push(step(*status, false, true));
            }
        }
        steps
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;

    pub(crate) fn sample_order(status: OrderStatus) -> Order {
        let created = Utc::now() - Duration::days(3);
        Order {
            id: OrderId::new(1042),
            order_number: OrderId::new(1042).order_number(),
            customer: Customer {
                name: "Ananya Rao".to_string(),
                email: Email::parse("ananya@example.com").unwrap(),
                phone: Some("9876543210".to_string()),
                address: ShippingAddress {
                    street: "12 MG Road".to_string(),
                    city: "Bengaluru".to_string(),
                    state: "Karnataka".to_string(),
                    pincode: "560001".to_string(),
                    country: "India".to_string(),
                },
            },
            items: vec![
                OrderItem {
                    product_id: Some(ProductId::new(1)),
                    name: "Royal Red Silk Saree".to_string(),
                    quantity: 2,
                    price: Price::from_rupees(2500),
                    image: None,
                },
                OrderItem {
                    product_id: None,
                    name: "Gift wrap".to_string(),
                    quantity: 1,
                    price: Price::from_rupees(50),
                    image: None,
                },
            ],
            payment_method: PaymentMethod::Cod,
            payment_result: None,
            total_price: Price::from_rupees(5050),
            order_status: status,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                timestamp: created,
                note: Some("Order placed successfully".to_string()),
                actor: Actor::System,
            }],
            confirmed_at: None,
            processing_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            delivery: Delivery::default(),
            notes: None,
            admin_notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_total_of_items() {
        let order = sample_order(OrderStatus::Pending);
        assert_eq!(Order::total_of(&order.items), Ok(Price::from_rupees(5050)));
        assert_eq!(order.unit_count(), 3);
    }

    #[test]
    fn test_total_of_overflow_is_an_error() {
        let mut order = sample_order(OrderStatus::Pending);
        order.items[0].price = Price::MAX;
        order.items[0].quantity = 10;
        assert_eq!(Order::total_of(&order.items), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_payment_result_is_paid() {
        let paid = PaymentResult {
            status: Some("Completed".to_string()),
            ..PaymentResult::default()
        };
        let pending = PaymentResult {
            status: Some("pending".to_string()),
            ..PaymentResult::default()
        };
        assert!(paid.is_paid());
        assert!(!pending.is_paid());
        assert!(!PaymentResult::default().is_paid());
    }

    #[test]
    fn test_address_completeness() {
        let order = sample_order(OrderStatus::Pending);
        assert!(order.customer.address.is_complete());
        let partial = ShippingAddress {
            street: "12 MG Road".to_string(),
            ..ShippingAddress::default()
        };
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_address_defaults_country() {
        let address: ShippingAddress =
            serde_json::from_str(r#"{"street":"a","city":"b","state":"c","pincode":"1"}"#).unwrap();
        assert_eq!(address.country, "India");
    }

    #[test]
    fn test_timeline_for_pending_order() {
        let timeline = sample_order(OrderStatus::Pending).tracking_timeline();
        let statuses: Vec<_> = timeline.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["placed", "confirmed"]);
        assert!(timeline[1].current);
        assert!(!timeline[1].completed);
        assert!(timeline[1].timestamp.is_none());
    }

    #[test]
    fn test_timeline_for_shipped_order() {
        let mut order = sample_order(OrderStatus::Shipped);
        order.shipped_at = Some(Utc::now());
        let timeline = order.tracking_timeline();
        let statuses: Vec<_> = timeline.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(
            statuses,
            vec!["placed", "confirmed", "processing", "shipped", "delivered"]
        );
        assert!(timeline[3].completed);
        assert_eq!(timeline[3].timestamp, order.shipped_at);
        // Steps without a stamp fall back to the last update
        assert_eq!(timeline[1].timestamp, Some(order.updated_at));
        assert!(timeline[4].current);
        assert_eq!(timeline[4].title, "Delivered");
    }

    #[test]
    fn test_timeline_for_delivered_order_has_no_current_step() {
        let timeline = sample_order(OrderStatus::Delivered).tracking_timeline();
        assert_eq!(timeline.len(), 5);
        assert!(timeline.iter().all(|s| s.completed && !s.current));
    }

    #[test]
    fn test_timeline_for_cancelled_order() {
        let mut order = sample_order(OrderStatus::Cancelled);
        order.status_history.push(StatusChange::now(
            OrderStatus::Confirmed,
            None,
            Actor::Admin,
        ));
        order.status_history.push(StatusChange::now(
            OrderStatus::Cancelled,
            Some("Out of stock".to_string()),
            Actor::Admin,
        ));
        let statuses: Vec<_> = order
            .tracking_timeline()
            .into_iter()
            .map(|s| s.status)
            .collect();
        assert_eq!(statuses, vec!["placed", "confirmed", "cancelled"]);
    }

    #[test]
    fn test_entered_at_prefers_history_when_unstamped() {
        let mut order = sample_order(OrderStatus::Confirmed);
        let change = StatusChange::now(OrderStatus::Confirmed, None, Actor::Admin);
        order.status_history.push(change.clone());
        assert_eq!(order.entered_at(OrderStatus::Confirmed), Some(change.timestamp));
        assert_eq!(order.entered_at(OrderStatus::Shipped), None);
    }

    #[test]
    fn test_items_serialize_without_absent_fields() {
        let order = sample_order(OrderStatus::Pending);
        let json = serde_json::to_value(&order.items[1]).unwrap();
        assert!(json.get("productId").is_none());
        assert_eq!(json["quantity"], 1);
    }
}
