//! Customer account routes: registration, login, profile, cart, wishlist
//! and address book.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use alankree_core::{AddressId, Email, ProductId, UserRole};

use crate::db::{
    AddressRepository, CartRepository, OrderRepository, ProfileUpdate, RepositoryError,
    UserRepository, WishlistRepository,
};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, Success};
use crate::middleware::RequireUser;
use crate::models::{Address, AddressInput, CartLine, Order, Product, User};
use crate::services::auth::{AuthService, LoginOutcome, Registration};
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The user block returned by register and login.
///
/// The back-office account has no user row, so its id is the literal
/// `"admin"`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub addresses: Vec<Address>,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionUser {
    fn customer(user: User, addresses: Vec<Address>) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            phone: user.phone.unwrap_or_default(),
            addresses,
            role: UserRole::User,
            is_admin: false,
        }
    }

    fn admin(email: Email) -> Self {
        Self {
            id: "admin".to_string(),
            name: "Administrator".to_string(),
            email,
            phone: String::new(),
            addresses: Vec::new(),
            role: UserRole::Admin,
            is_admin: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub message: &'static str,
    pub token: String,
    pub user: SessionUser,
}

/// Profile with the address book and wishlist attached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
    pub wishlist: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: Profile,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

impl From<ProfileRequest> for ProfileUpdate {
    fn from(request: ProfileRequest) -> Self {
        let clean = |s: String| Some(s.trim().to_owned()).filter(|s| !s.is_empty());
        Self {
            name: request.name.and_then(clean),
            phone: request.phone.and_then(clean),
            preferences: request.preferences.filter(serde_json::Value::is_object),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest {
    #[serde(alias = "product")]
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CartQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub cart: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
pub struct WishlistBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub wishlist: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct AddressBody {
    pub message: &'static str,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct OrdersBody {
    pub orders: Vec<Order>,
}

/// Map the repository's missing-product conflict to a 404.
fn unknown_product(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::Conflict(_) => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// POST /api/users/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Success<SessionBody>)> {
    let auth = AuthService::new(state.pool(), state.tokens(), &state.config().auth);
    let (user, token) = auth
        .register(Registration {
            name: &request.name,
            email: &request.email,
            password: &request.password,
            phone: request.phone.as_deref(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Success::new(SessionBody {
            message: "User registered successfully",
            token,
            user: SessionUser::customer(user, Vec::new()),
        }),
    ))
}

/// Log in. The back-office credentials yield an admin token here too.
///
/// POST /api/users/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Success<SessionBody>> {
    let auth = AuthService::new(state.pool(), state.tokens(), &state.config().auth);
    let body = match auth.login(&request.email, &request.password).await? {
        LoginOutcome::Admin { email, token } => SessionBody {
            message: "Admin login successful",
            token,
            user: SessionUser::admin(email),
        },
        LoginOutcome::Customer { user, token } => {
            let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
            tracing::info!(user_id = %user.id, "Customer logged in");
            SessionBody {
                message: "Login successful",
                token,
                user: SessionUser::customer(user, addresses),
            }
        }
    };
    Ok(Success::new(body))
}

// =============================================================================
// Profile
// =============================================================================

async fn load_profile(state: &AppState, user: User) -> Result<Profile> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    let wishlist = WishlistRepository::new(state.pool())
        .products(user.id)
        .await?;
    Ok(Profile {
        user,
        addresses,
        wishlist,
    })
}

/// GET /api/users/profile
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Success<ProfileBody>> {
    let profile = load_profile(&state, user).await?;
    Ok(Success::new(ProfileBody {
        message: None,
        user: profile,
    }))
}

/// PUT /api/users/profile
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(request): ApiJson<ProfileRequest>,
) -> Result<Success<ProfileBody>> {
    let updated = UserRepository::new(state.pool())
        .update_profile(user.id, &request.into())
        .await?;
    let profile = load_profile(&state, updated).await?;
    Ok(Success::new(ProfileBody {
        message: Some("Profile updated successfully"),
        user: profile,
    }))
}

/// Orders placed with the customer's email.
///
/// GET /api/users/orders
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Success<OrdersBody>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_email(&user.email)
        .await?;
    Ok(Success::new(OrdersBody { orders }))
}

// =============================================================================
// Cart
// =============================================================================

async fn cart_body(
    state: &AppState,
    user: &User,
    message: Option<&'static str>,
) -> Result<Success<CartBody>> {
    let cart = CartRepository::new(state.pool()).lines(user.id).await?;
    Ok(Success::new(CartBody { message, cart }))
}

/// GET /api/users/cart
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Success<CartBody>> {
    cart_body(&state, &user, None).await
}

/// Add to the cart, merging with an existing line for the same product.
///
/// POST /api/users/cart
#[instrument(skip_all, fields(user_id = %user.id, product_id = %request.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(request): ApiJson<CartAddRequest>,
) -> Result<Success<CartBody>> {
    if request.quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".to_string()));
    }
    CartRepository::new(state.pool())
        .add(user.id, request.product_id, request.quantity)
        .await
        .map_err(unknown_product)?;
    cart_body(&state, &user, Some("Product added to cart")).await
}

/// Set a line's quantity. Zero removes the line.
///
/// PUT /api/users/cart/{productId}
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn update_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<CartQuantityRequest>,
) -> Result<Success<CartBody>> {
    let carts = CartRepository::new(state.pool());
    let found = match request.quantity {
        q if q < 0 => {
            return Err(AppError::BadRequest("Quantity cannot be negative".to_string()));
        }
        0 => carts.remove(user.id, product_id).await?,
        q => carts.set_quantity(user.id, product_id, q).await?,
    };
    if !found {
        return Err(AppError::NotFound("Product not found in cart".to_string()));
    }
    cart_body(&state, &user, Some("Cart quantity updated")).await
}

/// DELETE /api/users/cart/{productId}
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Success<CartBody>> {
    CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    cart_body(&state, &user, Some("Product removed from cart")).await
}

// =============================================================================
// Wishlist
// =============================================================================

async fn wishlist_body(
    state: &AppState,
    user: &User,
    message: Option<&'static str>,
) -> Result<Success<WishlistBody>> {
    let wishlist = WishlistRepository::new(state.pool())
        .products(user.id)
        .await?;
    Ok(Success::new(WishlistBody { message, wishlist }))
}

/// GET /api/users/wishlist
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Success<WishlistBody>> {
    wishlist_body(&state, &user, None).await
}

/// POST /api/users/wishlist/{productId}
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Success<WishlistBody>> {
    WishlistRepository::new(state.pool())
        .add(user.id, product_id)
        .await
        .map_err(unknown_product)?;
    wishlist_body(&state, &user, Some("Product added to wishlist")).await
}

/// DELETE /api/users/wishlist/{productId}
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Success<WishlistBody>> {
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    wishlist_body(&state, &user, Some("Product removed from wishlist")).await
}

// =============================================================================
// Address book
// =============================================================================

fn complete_address(input: AddressInput) -> Result<AddressInput> {
    input.normalized().ok_or_else(|| {
        AppError::BadRequest("Street, city, state and pincode are required".to_string())
    })
}

fn address_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Address not found".to_string()),
        other => other.into(),
    }
}

/// POST /api/users/addresses
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(input): ApiJson<AddressInput>,
) -> Result<Success<AddressBody>> {
    let input = complete_address(input)?;
    let addresses = AddressRepository::new(state.pool())
        .add(user.id, &input)
        .await?;
    Ok(Success::new(AddressBody {
        message: "Address added successfully",
        addresses,
    }))
}

/// PUT /api/users/addresses/{addressId}
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(id): ApiPath<AddressId>,
    ApiJson(input): ApiJson<AddressInput>,
) -> Result<Success<AddressBody>> {
    let input = complete_address(input)?;
    let addresses = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await
        .map_err(address_not_found)?;
    Ok(Success::new(AddressBody {
        message: "Address updated successfully",
        addresses,
    }))
}

/// DELETE /api/users/addresses/{addressId}
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<Success<AddressBody>> {
    let addresses = AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await
        .map_err(address_not_found)?;
    Ok(Success::new(AddressBody {
        message: "Address deleted successfully",
        addresses,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_admin_session_user() {
        let user = SessionUser::admin(Email::parse("admin@alankree.in").unwrap());
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["id"], "admin");
        assert_eq!(value["isAdmin"], true);
        assert_eq!(value["role"], "admin");
        assert_eq!(value["addresses"], json!([]));
    }

    #[test]
    fn test_cart_add_defaults_quantity() {
        let request: CartAddRequest = serde_json::from_value(json!({ "productId": 7 })).unwrap();
        assert_eq!(request.quantity, 1);
        assert_eq!(request.product_id, ProductId::new(7));

        let request: CartAddRequest =
            serde_json::from_value(json!({ "product": 7, "quantity": 3 })).unwrap();
        assert_eq!(request.quantity, 3);
    }

    #[test]
    fn test_profile_request_drops_blanks() {
        let update: ProfileUpdate = ProfileRequest {
            name: Some("  ".to_string()),
            phone: Some(" 98450 12345 ".to_string()),
            preferences: Some(json!("not an object")),
        }
        .into();
        assert!(update.name.is_none());
        assert_eq!(update.phone.as_deref(), Some("98450 12345"));
        assert!(update.preferences.is_none());
    }

    #[test]
    fn test_unknown_product_maps_to_not_found() {
        let err = unknown_product(RepositoryError::Conflict("product does not exist".into()));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Product not found"));
    }
}
