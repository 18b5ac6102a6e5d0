//! Customer overview for the back office.
//!
//! Orders are linked to accounts by email, so guest orders placed before
//! registration show up under the account too.

use std::collections::{BTreeMap, HashMap};

use axum::extract::State;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use alankree_core::{OrderId, OrderStatus, PaymentMethod, Price, PriceError, UserId};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, Success};
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderItem, User};
use crate::state::AppState;

/// Orders shown per customer in the list view.
const RECENT_HISTORY_LEN: usize = 5;

/// An order as shown in customer views.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryEntry {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
}

impl From<Order> for OrderHistoryEntry {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            items: order.items,
            status: order.order_status,
            total_price: order.total_price,
            created_at: order.created_at,
            payment_method: order.payment_method,
        }
    }
}

fn status_breakdown(orders: &[Order]) -> BTreeMap<String, usize> {
    let mut breakdown = BTreeMap::new();
    for order in orders {
        *breakdown
            .entry(order.order_status.as_str().to_string())
            .or_insert(0) += 1;
    }
    breakdown
}

fn total_spent(orders: &[Order]) -> Result<Price> {
    orders
        .iter()
        .map(|o| o.total_price)
        .sum::<std::result::Result<Price, PriceError>>()
        .map_err(|e| AppError::Internal(format!("customer spend: {e}")))
}

// =============================================================================
// GET /users
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub user: User,
    pub total_orders: usize,
    pub total_spent: Price,
    pub last_order_date: Option<DateTime<Utc>>,
    pub order_status_breakdown: BTreeMap<String, usize>,
    pub order_history: Vec<OrderHistoryEntry>,
    /// Whether the customer has ever ordered.
    pub is_active: bool,
}

impl CustomerSummary {
    /// Summarise a customer from their orders, newest first.
    fn new(user: User, orders: Vec<Order>) -> Result<Self> {
        let total_orders = orders.len();
        Ok(Self {
            user,
            total_orders,
            total_spent: total_spent(&orders)?,
            last_order_date: orders.first().map(|o| o.created_at),
            order_status_breakdown: status_breakdown(&orders),
            order_history: orders
                .into_iter()
                .take(RECENT_HISTORY_LEN)
                .map(Into::into)
                .collect(),
            is_active: total_orders > 0,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerList {
    pub users: Vec<CustomerSummary>,
    pub total_users: usize,
}

/// GET /api/admin/users
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<CustomerList>> {
    let customers = UserRepository::new(state.pool()).list_customers().await?;
    let emails: Vec<String> = customers
        .iter()
        .map(|u| u.email.as_str().to_owned())
        .collect();
    let orders = OrderRepository::new(state.pool())
        .list_for_emails(&emails)
        .await?;

    // Orders arrive newest first; grouping keeps that order per customer
    let mut by_email: HashMap<String, Vec<Order>> = HashMap::new();
    for order in orders {
        by_email
            .entry(order.customer.email.as_str().to_owned())
            .or_default()
            .push(order);
    }

    let users = customers
        .into_iter()
        .map(|user| {
            let orders = by_email.remove(user.email.as_str()).unwrap_or_default();
            CustomerSummary::new(user, orders)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Success::new(CustomerList {
        total_users: users.len(),
        users,
    }))
}

// =============================================================================
// GET /users/{userId}
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_orders: usize,
    pub total_spent: Price,
    pub average_order_value: Price,
    pub orders_by_status: BTreeMap<String, usize>,
    /// Keyed `YYYY-M`.
    pub monthly_spending: BTreeMap<String, Price>,
}

impl CustomerStats {
    fn from_orders(orders: &[Order]) -> Result<Self> {
        let total_spent = total_spent(orders)?;
        let average_order_value = if orders.is_empty() {
            Price::ZERO
        } else {
            Price::new((total_spent.amount() / Decimal::from(orders.len())).round_dp(2))
                .unwrap_or_default()
        };

        let mut monthly_spending: BTreeMap<String, Price> = BTreeMap::new();
        for order in orders {
            let key = format!("{}-{}", order.created_at.year(), order.created_at.month());
            let entry = monthly_spending.entry(key).or_default();
            *entry = entry
                .checked_add(order.total_price)
                .map_err(|e| AppError::Internal(format!("monthly spend: {e}")))?;
        }

        Ok(Self {
            total_orders: orders.len(),
            total_spent,
            average_order_value,
            orders_by_status: status_breakdown(orders),
            monthly_spending,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub user: User,
    pub orders: Vec<OrderHistoryEntry>,
    pub stats: CustomerStats,
}

/// GET /api/admin/users/{userId}
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Success<CustomerDetail>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let orders = OrderRepository::new(state.pool())
        .list_by_email(&user.email)
        .await?;

    let stats = CustomerStats::from_orders(&orders)?;
    Ok(Success::new(CustomerDetail {
        user,
        orders: orders.into_iter().map(Into::into).collect(),
        stats,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alankree_core::{Email, UserRole};

    use super::*;
    use crate::models::order::tests::sample_order;

    fn customer() -> User {
        User {
            id: UserId::new(7),
            name: "Ananya Rao".to_string(),
            email: Email::parse("ananya@example.com").unwrap(),
            phone: None,
            role: UserRole::User,
            is_registered: true,
            is_active: true,
            preferences: serde_json::json!({}),
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_without_orders() {
        let summary = CustomerSummary::new(customer(), Vec::new()).unwrap();
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.total_spent, Price::ZERO);
        assert!(summary.last_order_date.is_none());
        assert!(!summary.is_active);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["name"], "Ananya Rao");
        assert_eq!(json["isActive"], false);
    }

    #[test]
    fn test_summary_keeps_five_most_recent() {
        let orders: Vec<Order> = (0..7)
            .map(|i| {
                let mut order = sample_order(if i == 0 {
                    OrderStatus::Delivered
                } else {
                    OrderStatus::Pending
                });
                order.id = OrderId::new(100 - i);
                order
            })
            .collect();

        let summary = CustomerSummary::new(customer(), orders).unwrap();
        assert_eq!(summary.total_orders, 7);
        assert_eq!(summary.total_spent, Price::from_rupees(5050 * 7));
        assert_eq!(summary.order_history.len(), 5);
        assert_eq!(summary.order_history[0].id, OrderId::new(100));
        assert_eq!(summary.order_status_breakdown.get("pending"), Some(&6));
        assert_eq!(summary.order_status_breakdown.get("delivered"), Some(&1));
        assert!(summary.is_active);
    }

    #[test]
    fn test_customer_stats() {
        let mut cheap = sample_order(OrderStatus::Cancelled);
        cheap.total_price = Price::from_rupees(950);
        let orders = vec![sample_order(OrderStatus::Delivered), cheap];

        let stats = CustomerStats::from_orders(&orders).unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_spent, Price::from_rupees(6000));
        assert_eq!(stats.average_order_value, Price::from_rupees(3000));

        let created = orders[0].created_at;
        let key = format!("{}-{}", created.year(), created.month());
        assert_eq!(stats.monthly_spending.get(&key), Some(&Price::from_rupees(6000)));
    }

    #[test]
    fn test_customer_stats_empty() {
        let stats = CustomerStats::from_orders(&[]).unwrap();
        assert_eq!(stats.average_order_value, Price::ZERO);
        assert!(stats.monthly_spending.is_empty());
    }
}
