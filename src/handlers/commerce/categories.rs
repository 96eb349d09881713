use crate::handlers::common::{
    created_response, no_content_response, success_response, ListParams, PaginatedResponse,
};
use crate::{
    auth::{AuthRouterExt, Role},
    errors::ServiceError,
    services::commerce::product_catalog_service::{
        CategorySort, CreateCategoryInput, UpdateCategoryInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_categories))
        .route("/:id", get(get_category))
        .with_role(Role::User);

    let write = Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category).delete(delete_category))
        .with_role(Role::Admin);

    read.merge(write)
}

async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let categories = state
        .services
        .product_catalog
        .list_categories(page, params.sort_by::<CategorySort>()?, params.sort_order()?)
        .await?;

    Ok(success_response(PaginatedResponse::from(categories)))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.product_catalog.get_category(id).await?;
    Ok(success_response(category))
}

async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state
        .services
        .product_catalog
        .create_category(payload)
        .await?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state
        .services
        .product_catalog
        .update_category(id, payload)
        .await?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.product_catalog.delete_category(id).await?;
    Ok(no_content_response())
}
