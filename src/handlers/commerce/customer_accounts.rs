use crate::handlers::common::{
    created_response, no_content_response, success_response, ListParams, PaginatedResponse,
};
use crate::{
    auth::{AuthRouterExt, Role},
    errors::ServiceError,
    services::commerce::customer_service::{
        AccountSort, CreateCustomerAccountInput, UpdateCustomerAccountInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

/// Creates the router for customer account endpoints. Admin only.
pub fn customer_accounts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route(
            "/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .with_role(Role::Admin)
}

async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let accounts = state
        .services
        .customer
        .list_accounts(page, params.sort_by::<AccountSort>()?, params.sort_order()?)
        .await?;

    Ok(success_response(PaginatedResponse::from(accounts)))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.customer.get_account(id).await?;
    Ok(success_response(account))
}

async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerAccountInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.customer.create_account(payload).await?;
    Ok(created_response(account))
}

async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerAccountInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.customer.update_account(id, payload).await?;
    Ok(success_response(account))
}

async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customer.delete_account(id).await?;
    Ok(no_content_response())
}
