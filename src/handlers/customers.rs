use crate::{
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, ListParams, PaginatedResponse,
    },
    services::commerce::customer_service::{
        CreateCustomerInput, CustomerSort, UpdateCustomerInput,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customer.create_customer(payload).await?;
    Ok(created_response(customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let customers = state
        .services
        .customer
        .list_customers(page, params.sort_by::<CustomerSort>()?, params.sort_order()?)
        .await?;
    Ok(success_response(PaginatedResponse::from(customers)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customer.get_customer(id).await?;
    Ok(success_response(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customer.update_customer(id, payload).await?;
    Ok(success_response(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customer.delete_customer(id).await?;
    Ok(no_content_response())
}
