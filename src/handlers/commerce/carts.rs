use crate::handlers::common::{
    created_response, no_content_response, success_response, ListParams, PaginatedResponse,
};
use crate::{
    auth::{AuthRouterExt, AuthUser, Role},
    errors::ServiceError,
    services::commerce::{CartLine, CartSort},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Creates the router for the caller's shopping cart. Any signed-in user.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/checkout", post(checkout))
        .route(
            "/:cart_id/items/:item_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .with_role(Role::User)
}

/// Customer whose cart the caller operates on
async fn caller_customer(state: &AppState, user: &AuthUser) -> Result<Uuid, ServiceError> {
    state
        .services
        .user
        .customer_for_user(user.user_id()?)
        .await
}

/// Get a page of cart lines with the whole-cart total
async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let sort_by = params.sort_by::<CartSort>()?;
    let sort_order = params.sort_order()?;
    let customer_id = caller_customer(&state, &user).await?;

    let contents = state
        .services
        .cart
        .list_lines(customer_id, sort_by, sort_order, page)
        .await?;

    Ok(success_response(CartResponse {
        cart_id: contents.cart_id,
        total: contents.total,
        lines: PaginatedResponse::from(contents.items),
    }))
}

/// Add a product to the cart, accumulating onto an existing line
async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = caller_customer(&state, &user).await?;
    let line = state
        .services
        .cart
        .add_line(customer_id, payload.product_id, payload.quantity)
        .await?;

    Ok(success_response(line))
}

/// Clear all items from cart
async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = caller_customer(&state, &user).await?;
    state.services.cart.clear(customer_id).await?;
    Ok(no_content_response())
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = caller_customer(&state, &user).await?;
    let line: CartLine = state
        .services
        .cart
        .update_line_quantity(customer_id, cart_id, item_id, payload.quantity)
        .await?;

    Ok(success_response(line))
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = caller_customer(&state, &user).await?;
    state
        .services
        .cart
        .remove_line(customer_id, cart_id, item_id)
        .await?;

    Ok(no_content_response())
}

/// Convert the cart into an order
async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let customer_id = caller_customer(&state, &user).await?;
    let placed = state.services.checkout.checkout(customer_id).await?;

    Ok(created_response(CheckoutResponse {
        order_id: placed.order.id,
        total_price: placed.order.total_price,
        items: placed.items.into_iter().map(CheckoutItem::from).collect(),
    }))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

// Response DTOs

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: Uuid,
    pub total: Decimal,
    #[serde(flatten)]
    pub lines: PaginatedResponse<CartLine>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub total_price: Decimal,
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_order: Decimal,
    pub subtotal: Decimal,
}

impl From<crate::entities::OrderItemModel> for CheckoutItem {
    fn from(item: crate::entities::OrderItemModel) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_order: item.price_at_order,
            subtotal: item.subtotal,
        }
    }
}
