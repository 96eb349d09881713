use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, ListParams, PaginatedResponse,
    },
    services::orders::{CreateOrderInput, OrderSort},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Places an order from explicit items for the caller's own customer.
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let caller_customer = state.services.user.linked_customer(user.user_id()?).await?;
    let order = state
        .services
        .order
        .create_order(caller_customer, payload)
        .await?;

    info!(order_id = %order.order.id, "Order placed via API");
    Ok(created_response(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let orders = state
        .services
        .order
        .list_orders(page, params.sort_by::<OrderSort>()?, params.sort_order()?)
        .await?;
    Ok(success_response(PaginatedResponse::from(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.order.get_order(id).await?;
    Ok(success_response(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.order.delete_order(id).await?;
    Ok(no_content_response())
}
