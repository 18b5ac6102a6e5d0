//! In-process notification feed for the back office.
//!
//! Notifications live only in memory: newest first, capped at
//! [`MAX_NOTIFICATIONS`], and lost on restart.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

use alankree_core::NotificationKind;

use crate::db::StockLevel;
use crate::models::Order;

/// Maximum number of notifications kept.
pub const MAX_NOTIFICATIONS: usize = 100;

/// Default page size for [`NotificationCenter::list`].
pub const DEFAULT_LIST_LIMIT: usize = 20;

const LOW_STOCK_DEDUPE_HOURS: i64 = 24;

/// A back-office notification.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// A page of notifications plus the overall unread count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// Feed statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// Shared notification feed.
///
/// Cloning is cheap; clones share the same feed.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    entries: Arc<RwLock<VecDeque<Notification>>>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a notification to the front of the feed.
    pub async fn add(&self, kind: NotificationKind, message: String, data: Value) -> Notification {
        let mut entries = self.entries.write().await;
        push(&mut entries, kind, message, data)
    }

    /// Newest notifications, optionally unread only.
    pub async fn list(&self, unread_only: bool, limit: usize) -> NotificationPage {
        let entries = self.entries.read().await;
        let notifications = entries
            .iter()
            .filter(|n| !unread_only || !n.read)
            .take(limit)
            .cloned()
            .collect();
        let unread_count = entries.iter().filter(|n| !n.read).count();
        NotificationPage {
            notifications,
            unread_count,
        }
    }

    pub async fn stats(&self) -> NotificationStats {
        let entries = self.entries.read().await;
        let mut by_type = BTreeMap::new();
        for notification in entries.iter() {
            *by_type
                .entry(notification.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        NotificationStats {
            total: entries.len(),
            unread: entries.iter().filter(|n| !n.read).count(),
            by_type,
        }
    }

    /// Mark one notification read. Returns `false` if it does not exist.
    pub async fn mark_read(&self, id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        entries
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| n.read = true)
            .is_some()
    }

    /// Mark everything read. Returns how many were unread.
    pub async fn mark_all_read(&self) -> usize {
        let mut entries = self.entries.write().await;
        let mut changed = 0;
        for notification in entries.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    /// Delete a notification. Returns `false` if it does not exist.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }

    /// Announce a newly placed order.
    pub async fn new_order(&self, order: &Order) -> Notification {
        self.add(
            NotificationKind::NewOrder,
            format!(
                "New order #{} received from {}",
                order.id.short_reference(),
                order.customer.name
            ),
            json!({
                "orderId": order.id,
                "customerName": order.customer.name,
                "amount": order.total_price,
                "itemCount": order.items.len(),
            }),
        )
        .await
    }

    /// Announce a customer cancellation.
    pub async fn order_cancelled(&self, order: &Order) -> Notification {
        self.add(
            NotificationKind::OrderCancelled,
            format!(
                "Order #{} has been cancelled by {}",
                order.id.short_reference(),
                order.customer.name
            ),
            json!({
                "orderId": order.id,
                "customerName": order.customer.name,
                "amount": order.total_price,
            }),
        )
        .await
    }

    /// Announce a captured payment.
    pub async fn payment_received(&self, order: &Order) -> Notification {
        self.add(
            NotificationKind::PaymentReceived,
            format!(
                "Payment received for order #{} - {}",
                order.id.short_reference(),
                order.total_price
            ),
            json!({
                "orderId": order.id,
                "amount": order.total_price,
                "paymentMethod": order.payment_method,
            }),
        )
        .await
    }

    /// Raise a low-stock alert unless the product had one in the last 24 hours.
    ///
    /// Returns `None` when the alert was suppressed. The check and the push
    /// share one write guard.
    pub async fn low_stock(&self, level: &StockLevel) -> Option<Notification> {
        let cutoff = Utc::now() - Duration::hours(LOW_STOCK_DEDUPE_HOURS);
        let product_id = json!(level.id);

        let mut entries = self.entries.write().await;
        let recent = entries.iter().any(|n| {
            n.kind == NotificationKind::LowStock
                && n.timestamp > cutoff
                && n.data.get("productId") == Some(&product_id)
        });
        if recent {
            return None;
        }

        Some(push(
            &mut entries,
            NotificationKind::LowStock,
            format!(
                "Low stock alert: {} ({} remaining)",
                level.name, level.stock
            ),
            json!({
                "productId": level.id,
                "productName": level.name,
                "currentStock": level.stock,
            }),
        ))
    }
}

fn push(
    entries: &mut VecDeque<Notification>,
    kind: NotificationKind,
    message: String,
    data: Value,
) -> Notification {
    let notification = Notification {
        id: Uuid::new_v4(),
        kind,
        message,
        data,
        timestamp: Utc::now(),
        read: false,
    };
    entries.push_front(notification.clone());
    entries.truncate(MAX_NOTIFICATIONS);

    tracing::debug!(id = %notification.id, kind = %kind, "Notification added");
    notification
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alankree_core::{OrderStatus, ProductId};

    use super::*;
    use crate::models::order::tests::sample_order;

    fn level(id: i32, stock: i32) -> StockLevel {
        StockLevel {
            id: ProductId::new(id),
            name: "Royal Red Silk Saree".to_string(),
            stock,
        }
    }

    #[tokio::test]
    async fn test_newest_first_and_capped() {
        let center = NotificationCenter::new();
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            center
                .add(NotificationKind::NewOrder, format!("order {i}"), Value::Null)
                .await;
        }
        let page = center.list(false, MAX_NOTIFICATIONS * 2).await;
        assert_eq!(page.notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(page.notifications[0].message, "order 104");
        assert_eq!(page.unread_count, MAX_NOTIFICATIONS);
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_filter() {
        let center = NotificationCenter::new();
        let first = center
            .add(NotificationKind::NewOrder, "a".to_string(), Value::Null)
            .await;
        center
            .add(NotificationKind::LowStock, "b".to_string(), Value::Null)
            .await;

        assert!(center.mark_read(first.id).await);
        assert!(!center.mark_read(Uuid::new_v4()).await);

        let unread = center.list(true, DEFAULT_LIST_LIMIT).await;
        assert_eq!(unread.notifications.len(), 1);
        assert_eq!(unread.notifications[0].message, "b");
        assert_eq!(unread.unread_count, 1);

        assert_eq!(center.mark_all_read().await, 1);
        assert_eq!(center.list(true, DEFAULT_LIST_LIMIT).await.unread_count, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let center = NotificationCenter::new();
        let n = center
            .add(NotificationKind::NewOrder, "a".to_string(), Value::Null)
            .await;
        assert!(center.delete(n.id).await);
        assert!(!center.delete(n.id).await);
        assert_eq!(center.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_stats_by_type() {
        let center = NotificationCenter::new();
        let order = sample_order(OrderStatus::Pending);
        center.new_order(&order).await;
        center.new_order(&order).await;
        center.order_cancelled(&order).await;

        let stats = center.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unread, 3);
        assert_eq!(stats.by_type.get("new_order"), Some(&2));
        assert_eq!(stats.by_type.get("order_cancelled"), Some(&1));
    }

    #[tokio::test]
    async fn test_order_messages_use_short_reference() {
        let center = NotificationCenter::new();
        let order = sample_order(OrderStatus::Pending);
        let n = center.new_order(&order).await;
        assert_eq!(n.message, "New order #001042 received from Ananya Rao");
        assert_eq!(n.data["itemCount"], 2);

        let paid = center.payment_received(&order).await;
        assert_eq!(paid.message, "Payment received for order #001042 - ₹5050.00");
        assert_eq!(paid.data["paymentMethod"], "cod");
    }

    #[tokio::test]
    async fn test_low_stock_deduplicated_per_product() {
        let center = NotificationCenter::new();
        assert!(center.low_stock(&level(1, 3)).await.is_some());
        assert!(center.low_stock(&level(1, 2)).await.is_none());
        assert!(center.low_stock(&level(2, 5)).await.is_some());
        assert_eq!(center.stats().await.by_type.get("low_stock"), Some(&2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_low_stock_raises_one_alert() {
        let center = NotificationCenter::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let center = center.clone();
                tokio::spawn(async move { center.low_stock(&level(9, 4)).await.is_some() })
            })
            .collect();

        let mut raised = 0;
        for handle in handles {
            if handle.await.unwrap() {
                raised += 1;
            }
        }
        assert_eq!(raised, 1);
        assert_eq!(center.stats().await.by_type.get("low_stock"), Some(&1));
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let n = Notification {
            id: Uuid::nil(),
            kind: NotificationKind::LowStock,
            message: "m".to_string(),
            data: Value::Null,
            timestamp: Utc::now(),
            read: false,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["read"], false);
    }
}
