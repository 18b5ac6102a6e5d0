//! Checkout and order status changes.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use alankree_core::{
    Actor, Email, OrderId, OrderStatus, PaymentMethod, Price, ProductId,
};

use crate::db::{
    AddressRepository, CartRepository, NewOrder, OrderRepository, RepositoryError, UserRepository,
};
use crate::models::{
    Customer, LOW_STOCK_THRESHOLD, Order, OrderItem, PaymentResult, ShippingAddress, StatusChange,
    User,
};
use crate::services::notifications::NotificationCenter;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Request failed a business rule; the message is shown to the client.
    #[error("{0}")]
    Invalid(String),

    /// Order does not exist or is not visible to the caller.
    #[error("order not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Guest contact details sent with a checkout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Extra contact details some clients send alongside the guest block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub phone: Option<String>,
}

/// One line of a checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    #[serde(default, alias = "product")]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub user: Option<GuestDetails>,
    #[serde(default)]
    pub customer_info: Option<CustomerInfo>,
    #[serde(default, alias = "items")]
    pub order_items: Vec<CheckoutItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_result: Option<PaymentResult>,
    /// Client-computed total. Only compared against the server total.
    #[serde(default)]
    pub total_price: Option<Price>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Order workflow service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    notifications: &'a NotificationCenter,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, notifications: &'a NotificationCenter) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// Place an order for a signed-in customer or a guest.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Invalid` when customer details, address or items
    /// are missing or malformed.
    #[instrument(skip(self, customer, request), fields(authenticated = customer.is_some()))]
    pub async fn checkout(
        &self,
        customer: Option<&User>,
        request: CheckoutRequest,
    ) -> Result<Order, OrderError> {
        let snapshot = match customer {
            Some(user) => self.customer_snapshot(user, &request).await?,
            None => self.guest_snapshot(&request).await?,
        };

        let items = validate_items(request.order_items)?;
        let total_price = order_total(&items)?;
        if let Some(claimed) = request.total_price
            && claimed != total_price
        {
            warn!(
                claimed = %claimed,
                computed = %total_price,
                "Client total does not match line items, using computed total"
            );
        }

        let new_order = NewOrder {
            customer: snapshot,
            items,
            payment_method: request.payment_method.unwrap_or_default(),
            payment_result: request.payment_result,
            total_price,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            initial_change: StatusChange::now(
                OrderStatus::Pending,
                Some("Order placed successfully".to_string()),
                Actor::System,
            ),
        };

        let (order, levels) = OrderRepository::new(self.pool).create(&new_order).await?;
        info!(order_id = %order.id, total = %order.total_price, "Order placed");

        for level in levels
            .iter()
            .filter(|l| l.stock > 0 && l.stock < LOW_STOCK_THRESHOLD)
        {
            self.notifications.low_stock(level).await;
        }
        self.notifications.new_order(&order).await;
        if order.payment_result.as_ref().is_some_and(PaymentResult::is_paid) {
            self.notifications.payment_received(&order).await;
        }

        if let Some(user) = customer
            && let Err(e) = CartRepository::new(self.pool).clear(user.id).await
        {
            warn!(user_id = %user.id, error = %e, "Failed to clear cart after checkout");
        }

        Ok(order)
    }

    async fn customer_snapshot(
        &self,
        user: &User,
        request: &CheckoutRequest,
    ) -> Result<Customer, OrderError> {
        let address = match request.shipping_address.clone() {
            Some(address) if address.is_complete() => address,
            _ => AddressRepository::new(self.pool)
                .preferred(user.id)
                .await?
                .map(|a| ShippingAddress::from(&a))
                .ok_or_else(|| OrderError::Invalid("Shipping address is required".to_string()))?,
        };

        let phone = user.phone.clone().or_else(|| request_phone(request));
        Ok(Customer {
            name: user.name.clone(),
            email: user.email.clone(),
            phone,
            address,
        })
    }

    async fn guest_snapshot(&self, request: &CheckoutRequest) -> Result<Customer, OrderError> {
        let customer = guest_customer(request)?;

        match UserRepository::new(self.pool)
            .ensure_guest(&customer.name, &customer.email, customer.phone.as_deref())
            .await
        {
            Ok(true) => info!(email = %customer.email, "Created guest customer record"),
            Ok(false) => {}
            Err(e) => warn!(email = %customer.email, error = %e, "Could not record guest customer"),
        }

        Ok(customer)
    }

    /// Cancel an order on behalf of the customer who placed it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for orders the customer does not own
    /// and `OrderError::Invalid` once the order has shipped.
    #[instrument(skip(self, user, reason), fields(user_id = %user.id))]
    pub async fn cancel_by_customer(
        &self,
        user: &User,
        id: OrderId,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let orders = OrderRepository::new(self.pool);
        let order = orders
            .get(id)
            .await?
            .filter(|o| o.is_owned_by(&user.email))
            .ok_or(OrderError::NotFound)?;

        check_customer_cancel(order.order_status)?;

        let note = reason
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Cancelled by customer".to_string());
        let change = StatusChange::now(OrderStatus::Cancelled, Some(note), Actor::Customer);

        // An admin may have shipped it since the read; the locked row decides
        let order = orders
            .update_status(id, &change, &OrderStatus::CUSTOMER_CANCELLABLE)
            .await
            .map_err(customer_cancel_error)?;
        info!(order_id = %order.id, "Order cancelled by customer");

        self.notifications.order_cancelled(&order).await;
        Ok(order)
    }

    /// Set any status on a non-terminal order from the back office.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist and
    /// `OrderError::Invalid` for changes to delivered or cancelled orders.
    #[instrument(skip(self, notes))]
    pub async fn update_status_as_admin(
        &self,
        id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, OrderError> {
        let orders = OrderRepository::new(self.pool);
        let order = orders.get(id).await?.ok_or(OrderError::NotFound)?;

        check_admin_transition(order.order_status, status)?;

        let note = notes.filter(|n| !n.trim().is_empty());
        let change = StatusChange::now(status, note, Actor::Admin);
        let order = orders
            .update_status(id, &change, OrderStatus::ALL)
            .await
            .map_err(status_update_error)?;

        info!(order_id = %order.id, status = %status, "Order status updated by admin");
        Ok(order)
    }
}

fn status_update_error(err: RepositoryError) -> OrderError {
    match err {
        RepositoryError::NotFound => OrderError::NotFound,
        RepositoryError::Conflict(message) => OrderError::Invalid(format!("Cannot update: {message}")),
        other => OrderError::Repository(other),
    }
}

fn customer_cancel_error(err: RepositoryError) -> OrderError {
    match err {
        RepositoryError::Conflict(message) => {
            OrderError::Invalid(format!("Cannot cancel order: {message}"))
        }
        other => status_update_error(other),
    }
}

fn request_phone(request: &CheckoutRequest) -> Option<String> {
    request
        .user
        .as_ref()
        .and_then(|u| u.phone.clone())
        .or_else(|| request.customer_info.as_ref().and_then(|c| c.phone.clone()))
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty())
}

/// Build the customer snapshot for a guest checkout.
fn guest_customer(request: &CheckoutRequest) -> Result<Customer, OrderError> {
    let details = request
        .user
        .as_ref()
        .filter(|u| !u.name.trim().is_empty() && !u.email.trim().is_empty())
        .ok_or_else(|| OrderError::Invalid("User information is required".to_string()))?;

    let email = Email::parse(&details.email)
        .map_err(|e| OrderError::Invalid(format!("Invalid email: {e}")))?;

    let address = request
        .shipping_address
        .clone()
        .filter(ShippingAddress::is_complete)
        .ok_or_else(|| OrderError::Invalid("Shipping address is required".to_string()))?;

    Ok(Customer {
        name: details.name.trim().to_owned(),
        email,
        phone: request_phone(request),
        address,
    })
}

/// Check checkout lines and convert them to order items.
fn validate_items(items: Vec<CheckoutItem>) -> Result<Vec<OrderItem>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::Invalid("Order must contain at least one item".to_string()));
    }

    items
        .into_iter()
        .map(|item| {
            let name = item.name.trim().to_owned();
            if name.is_empty() {
                return Err(OrderError::Invalid("Every item needs a name".to_string()));
            }
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| *q >= 1)
                .ok_or_else(|| {
                    OrderError::Invalid(format!("Invalid quantity for {name}"))
                })?;
            Ok(OrderItem {
                product_id: item.product_id,
                name,
                quantity,
                price: item.price,
                image: item.image.filter(|i| !i.trim().is_empty()),
            })
        })
        .collect()
}

fn order_total(items: &[OrderItem]) -> Result<Price, OrderError> {
    Order::total_of(items)
        .map_err(|_| OrderError::Invalid("Order total is too large".to_string()))
}

/// Customers may cancel until the order ships.
fn check_customer_cancel(current: OrderStatus) -> Result<(), OrderError> {
    if current.customer_can_cancel() {
        return Ok(());
    }
    Err(OrderError::Invalid(if current == OrderStatus::Shipped {
        "Cannot cancel order that has already been shipped".to_string()
    } else {
        format!("Cannot cancel order that is already {current}")
    }))
}

/// Admins may move a non-terminal order anywhere; terminal orders are frozen.
fn check_admin_transition(current: OrderStatus, next: OrderStatus) -> Result<(), OrderError> {
    if current.is_terminal() && current != next {
        return Err(OrderError::Invalid(format!(
            "Cannot change status of a {current} order"
        )));
    }
    Ok(())
}
