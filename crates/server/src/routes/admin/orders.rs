//! Back-office order management.

use axum::extract::State;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use alankree_core::{DeliveryStatus, OrderId, OrderStatus, PaymentMethod, Price, ProductId};

use crate::db::{OrderListQuery, OrderRepository, OrderSort};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Success};
use crate::middleware::RequireAdmin;
use crate::models::{
    Customer, Delivery, DeliveryAgent, Order, OrderItem, ShippingAddress, StatusChange,
    TrackingStep,
};
use crate::routes::orders::StatusRequest;
use crate::services::orders::OrderService;
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// List
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<ListParams> for OrderListQuery {
    fn from(params: ListParams) -> Self {
        let defaults = Self::default();
        Self {
            status: params.status,
            sort: OrderSort::parse(params.sort_by.as_deref()),
            descending: !params
                .sort_order
                .is_some_and(|o| o.eq_ignore_ascii_case("asc")),
            page: params.page.unwrap_or(defaults.page).max(1),
            limit: params
                .limit
                .unwrap_or(defaults.limit)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// A line item as the order screens show it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderLine {
    pub product_id: Option<ProductId>,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: Price,
    pub subtotal: Price,
}

impl From<&OrderItem> for AdminOrderLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price,
            // Stored lines passed checkout, so they fit a price
            subtotal: item.line_total().unwrap_or(Price::MAX),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub total_items: u32,
    pub items_breakdown: String,
}

/// Row of the back-office order table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub customer: Customer,
    pub items: Vec<AdminOrderLine>,
    pub status: OrderStatus,
    pub total_price: Price,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipping_address: ShippingAddress,
    pub status_history: Vec<StatusChange>,
    pub delivery: Delivery,
    pub order_summary: ListSummary,
}

impl From<Order> for AdminOrderSummary {
    fn from(order: Order) -> Self {
        let order_summary = ListSummary {
            total_items: order.unit_count(),
            items_breakdown: items_breakdown(&order.items),
        };
        Self {
            id: order.id,
            order_number: order.order_number,
            items: order.items.iter().map(AdminOrderLine::from).collect(),
            status: order.order_status,
            total_price: order.total_price,
            payment_method: order.payment_method,
            created_at: order.created_at,
            updated_at: order.updated_at,
            shipping_address: order.customer.address.clone(),
            customer: order.customer,
            status_history: order.status_history,
            delivery: order.delivery,
            order_summary,
        }
    }
}

fn items_breakdown(items: &[OrderItem]) -> String {
    if items.is_empty() {
        return "No items".to_string();
    }
    items
        .iter()
        .map(|item| format!("{}x {}", item.quantity, item.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            current: page,
            pages: (total + limit - 1) / limit,
            total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<AdminOrderSummary>,
    pub pagination: Pagination,
}

/// GET /api/admin/orders
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Success<OrderPage>> {
    let query = OrderListQuery::from(params);
    let (orders, total) = OrderRepository::new(state.pool())
        .list_page(&query)
        .await?;

    Ok(Success::new(OrderPage {
        orders: orders.into_iter().map(AdminOrderSummary::from).collect(),
        pagination: Pagination::new(query.page, query.limit, total),
    }))
}

// =============================================================================
// Detail
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub discount: Price,
    pub total_price: Price,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDates {
    pub order_placed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub confirmed: Option<DateTime<Utc>>,
    pub processing: Option<DateTime<Utc>>,
    pub shipped: Option<DateTime<Utc>>,
    pub delivered: Option<DateTime<Utc>>,
    pub cancelled: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSummary {
    pub total_items: u32,
    pub unique_products: usize,
    pub items_list: Vec<String>,
}

/// Everything the order detail screen shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    pub id: OrderId,
    pub order_number: String,
    pub customer: Customer,
    pub items: Vec<AdminOrderLine>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: String,
    pub pricing: Pricing,
    pub shipping_address: ShippingAddress,
    pub dates: OrderDates,
    pub summary: DetailSummary,
    pub status_history: Vec<StatusChange>,
    pub delivery: Delivery,
    pub notes: String,
    pub admin_notes: String,
    pub tracking_history: Vec<TrackingStep>,
}

impl From<Order> for AdminOrderDetail {
    fn from(order: Order) -> Self {
        let tracking_history = order.tracking_timeline();
        let subtotal = Order::total_of(&order.items).unwrap_or(order.total_price);
        let summary = DetailSummary {
            total_items: order.unit_count(),
            unique_products: order.items.len(),
            items_list: order
                .items
                .iter()
                .map(|item| format!("{}x {} ({})", item.quantity, item.name, item.price))
                .collect(),
        };
        let payment_status = order
            .payment_result
            .as_ref()
            .and_then(|r| r.status.clone())
            .unwrap_or_else(|| "pending".to_string());

        Self {
            id: order.id,
            order_number: order.order_number,
            items: order.items.iter().map(AdminOrderLine::from).collect(),
            status: order.order_status,
            payment_method: order.payment_method,
            payment_status,
            pricing: Pricing {
                subtotal,
                tax: Price::ZERO,
                shipping: Price::ZERO,
                discount: Price::ZERO,
                total_price: order.total_price,
            },
            shipping_address: order.customer.address.clone(),
            customer: order.customer,
            dates: OrderDates {
                order_placed: order.created_at,
                last_updated: order.updated_at,
                confirmed: order.confirmed_at,
                processing: order.processing_at,
                shipped: order.shipped_at,
                delivered: order.delivered_at,
                cancelled: order.cancelled_at,
            },
            summary,
            status_history: order.status_history,
            delivery: order.delivery,
            notes: order.notes.unwrap_or_default(),
            admin_notes: order.admin_notes.unwrap_or_default(),
            tracking_history,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailBody {
    pub order: AdminOrderDetail,
}

async fn find_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// GET /api/admin/orders/{orderId}
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Success<DetailBody>> {
    let order = find_order(&state, id).await?;
    Ok(Success::new(DetailBody {
        order: order.into(),
    }))
}

// =============================================================================
// Updates
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UpdatedOrder {
    pub message: String,
    pub order: Order,
}

/// PUT /api/admin/orders/{orderId}/status
#[instrument(skip_all, fields(order_id = %id, status = %request.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Success<UpdatedOrder>> {
    let order = OrderService::new(state.pool(), state.notifications())
        .update_status_as_admin(id, request.status, request.notes)
        .await?;
    Ok(Success::new(UpdatedOrder {
        message: format!("Order status updated to {}", order.order_status),
        order,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub delivery_agent: Option<AgentInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Accept either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
fn parse_estimated_delivery(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid estimatedDelivery: {raw}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn agent_assigned_now(input: AgentInput) -> Result<DeliveryAgent> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Agent name is required".to_string()));
    }
    Ok(DeliveryAgent {
        name: name.to_owned(),
        phone: non_blank(input.phone),
        email: non_blank(input.email),
        assigned_at: Utc::now(),
    })
}

/// Apply a delivery update over the current tracking block.
///
/// An absent agent keeps the one already assigned.
fn apply_delivery(current: Delivery, request: DeliveryRequest) -> Result<Delivery> {
    let estimated_delivery = request
        .estimated_delivery
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_estimated_delivery)
        .transpose()?;
    let agent = match request.delivery_agent {
        Some(input) => Some(agent_assigned_now(input)?),
        None => current.agent,
    };

    Ok(Delivery {
        status: request.delivery_status,
        tracking_number: non_blank(request.tracking_number),
        estimated_delivery,
        agent,
        updated_at: Some(Utc::now()),
    })
}

/// PUT /api/admin/orders/{orderId}/delivery
#[instrument(skip_all, fields(order_id = %id, delivery_status = %request.delivery_status))]
pub async fn update_delivery(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<DeliveryRequest>,
) -> Result<Success<UpdatedOrder>> {
    let current = find_order(&state, id).await?;
    let notes = non_blank(request.notes.clone());
    let delivery = apply_delivery(current.delivery, request)?;

    let order = OrderRepository::new(state.pool())
        .update_delivery(id, &delivery, notes.as_deref())
        .await?;
    tracing::info!(order_id = %order.id, "Delivery information updated");

    Ok(Success::new(UpdatedOrder {
        message: "Delivery information updated successfully".to_string(),
        order,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub agent_phone: Option<String>,
    #[serde(default)]
    pub agent_email: Option<String>,
}

/// Assign a courier. A pending delivery moves to `assigned`.
///
/// PUT /api/admin/orders/{orderId}/agent
#[instrument(skip_all, fields(order_id = %id))]
pub async fn assign_agent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<AgentRequest>,
) -> Result<Success<UpdatedOrder>> {
    let agent = agent_assigned_now(AgentInput {
        name: request.agent_name,
        phone: request.agent_phone,
        email: request.agent_email,
    })?;

    let mut delivery = find_order(&state, id).await?.delivery;
    if delivery.status == DeliveryStatus::Pending {
        delivery.status = DeliveryStatus::Assigned;
    }
    delivery.agent = Some(agent);
    delivery.updated_at = Some(Utc::now());

    let order = OrderRepository::new(state.pool())
        .update_delivery(id, &delivery, None)
        .await?;
    tracing::info!(order_id = %order.id, "Delivery agent assigned");

    Ok(Success::new(UpdatedOrder {
        message: "Delivery agent assigned successfully".to_string(),
        order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Datelike;

    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_list_params_defaults_and_clamping() {
        let query = OrderListQuery::from(ListParams::default());
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 50);
        assert!(query.descending);

        let query = OrderListQuery::from(ListParams {
            page: Some(0),
            limit: Some(10_000),
            sort_by: Some("totalPrice".to_string()),
            sort_order: Some("ASC".to_string()),
            ..ListParams::default()
        });
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_SIZE);
        assert!(!query.descending);
        assert!(matches!(query.sort, OrderSort::TotalPrice));
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(2, 50, 101);
        assert_eq!((p.current, p.pages, p.total), (2, 3, 101));
        assert_eq!(Pagination::new(1, 50, 0).pages, 0);
    }

    #[test]
    fn test_summary_breakdown() {
        let summary = AdminOrderSummary::from(sample_order(OrderStatus::Pending));
        let units: u32 = summary.items.iter().map(|i| i.quantity).sum();
        assert_eq!(summary.order_summary.total_items, units);
        assert!(summary.order_summary.items_breakdown.contains("x "));
        assert_eq!(items_breakdown(&[]), "No items");
    }

    #[test]
    fn test_detail_includes_timeline_and_pricing() {
        let order = sample_order(OrderStatus::Confirmed);
        let total = order.total_price;
        let detail = AdminOrderDetail::from(order);
        assert_eq!(detail.order_number, "00001042");
        assert_eq!(detail.pricing.total_price, total);
        assert_eq!(detail.pricing.subtotal, total);
        assert_eq!(detail.payment_status, "pending");
        assert!(detail.tracking_history.iter().any(|s| s.current));
    }

    #[test]
    fn test_estimated_delivery_formats() {
        let at = parse_estimated_delivery("2025-03-14").unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2025, 3, 14));
        assert!(parse_estimated_delivery("2025-03-14T10:00:00+05:30").is_ok());
        assert!(parse_estimated_delivery("next week").is_err());
    }

    #[test]
    fn test_delivery_update_keeps_existing_agent() {
        let current = Delivery {
            agent: Some(DeliveryAgent {
                name: "Ravi".to_string(),
                phone: None,
                email: None,
                assigned_at: Utc::now(),
            }),
            ..Delivery::default()
        };
        let request = DeliveryRequest {
            delivery_status: DeliveryStatus::InTransit,
            tracking_number: Some(" BLR123 ".to_string()),
            estimated_delivery: None,
            delivery_agent: None,
            notes: None,
        };
        let delivery = apply_delivery(current, request).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::InTransit);
        assert_eq!(delivery.tracking_number.as_deref(), Some("BLR123"));
        assert_eq!(delivery.agent.unwrap().name, "Ravi");
        assert!(delivery.updated_at.is_some());
    }
}
