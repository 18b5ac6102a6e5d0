//! Checkout, order lookup and cancellation routes.

use axum::{body::Bytes, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use alankree_core::{Email, OrderId, OrderStatus, Price};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Success};
use crate::middleware::{OptionalUser, RequireAdmin, RequireUser};
use crate::models::{Delivery, Order, OrderItem, StatusChange};
use crate::services::orders::{CheckoutRequest, OrderService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrderMessage {
    pub message: &'static str,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderBody {
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub count: usize,
    pub orders: Vec<Order>,
}

impl From<Vec<Order>> for OrderList {
    fn from(orders: Vec<Order>) -> Self {
        Self {
            count: orders.len(),
            orders,
        }
    }
}

/// `?email=` used by guests to prove they placed an order.
#[derive(Debug, Default, Deserialize)]
pub struct EmailParam {
    pub email: Option<String>,
}

impl EmailParam {
    fn parsed(&self) -> Option<Email> {
        self.email.as_deref().and_then(|e| Email::parse(e).ok())
    }
}

/// Public tracking view: enough to follow a parcel, nothing about the
/// customer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub delivery: Delivery,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}

impl From<Order> for TrackedOrder {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            order_status: order.order_status,
            status_history: order.status_history,
            delivery: order.delivery,
            total_price: order.total_price,
            created_at: order.created_at,
            confirmed_at: order.confirmed_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            items: order.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackingBody {
    pub order: TrackedOrder,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Place an order as a guest, or as the signed-in customer when a valid
/// token is sent.
///
/// POST /api/orders/create
#[instrument(skip(state, user, request))]
pub async fn create(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Success<OrderMessage>)> {
    place(&state, user.as_ref(), request).await
}

/// POST /api/orders/create-auth
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn create_authenticated(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Success<OrderMessage>)> {
    place(&state, Some(&user), request).await
}

async fn place(
    state: &AppState,
    user: Option<&crate::models::User>,
    request: CheckoutRequest,
) -> Result<(StatusCode, Success<OrderMessage>)> {
    let order = OrderService::new(state.pool(), state.notifications())
        .checkout(user, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Success::new(OrderMessage {
            message: "Order placed successfully",
            order,
        }),
    ))
}

/// Full order details for the customer who placed it.
///
/// The caller proves ownership with a customer token or `?email=`.
///
/// GET /api/orders/{id}
#[instrument(skip(state, user, params))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ApiPath(id): ApiPath<OrderId>,
    ApiQuery(params): ApiQuery<EmailParam>,
) -> Result<Success<OrderBody>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let by_token = user.as_ref().is_some_and(|u| order.is_owned_by(&u.email));
    let by_email = params.parsed().is_some_and(|e| order.is_owned_by(&e));
    if !(by_token || by_email) {
        return Err(AppError::NotFound("Order not found".to_string()));
    }

    Ok(Success::new(OrderBody { order }))
}

/// Public order tracking by id and email.
///
/// GET /api/orders/track/{orderId}?email=
#[instrument(skip(state, params))]
pub async fn track(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiQuery(params): ApiQuery<EmailParam>,
) -> Result<Success<TrackingBody>> {
    if params.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "Email is required to track order".to_string(),
        ));
    }

    let not_found = || AppError::NotFound("Order not found or email does not match".to_string());
    let email = params.parsed().ok_or_else(not_found)?;
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|o| o.is_owned_by(&email))
        .ok_or_else(not_found)?;

    Ok(Success::new(TrackingBody {
        order: order.into(),
    }))
}

/// PUT /api/orders/{id}/cancel
///
/// The body is optional; `{"reason": ...}` is recorded in the history.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(id): ApiPath<OrderId>,
    body: Bytes,
) -> Result<Success<OrderMessage>> {
    let request: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };
    let order = OrderService::new(state.pool(), state.notifications())
        .cancel_by_customer(&user, id, request.reason)
        .await?;
    Ok(Success::new(OrderMessage {
        message: "Order cancelled successfully",
        order,
    }))
}

/// Orders placed with the signed-in customer's email, newest first.
///
/// GET /api/orders/user/my-orders
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Success<OrderList>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_email(&user.email)
        .await?;
    Ok(Success::new(orders.into()))
}

/// GET /api/orders/admin/all
#[instrument(skip_all)]
pub async fn all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<OrderList>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Success::new(orders.into()))
}

/// PUT /api/orders/admin/status/{id}
#[instrument(skip_all, fields(order_id = %id, status = %request.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Success<OrderMessage>> {
    let order = OrderService::new(state.pool(), state.notifications())
        .update_status_as_admin(id, request.status, request.notes)
        .await?;
    Ok(Success::new(OrderMessage {
        message: "Order status updated successfully",
        order,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_tracked_order_omits_customer() {
        let tracked: TrackedOrder = sample_order(OrderStatus::Shipped).into();
        let json = serde_json::to_value(&tracked).unwrap_or_default();
        assert!(json.get("customer").is_none());
        assert_eq!(json["orderStatus"], "shipped");
        assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_email_param_parsing() {
        let param = EmailParam {
            email: Some(" Ananya@Example.com ".to_string()),
        };
        assert_eq!(
            param.parsed().map(Email::into_inner).as_deref(),
            Some("ananya@example.com")
        );
        assert!(EmailParam { email: Some("nope".to_string()) }.parsed().is_none());
    }
}
