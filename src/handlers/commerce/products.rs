use crate::handlers::common::{
    created_response, no_content_response, success_response, ListParams, PaginatedResponse,
};
use crate::{
    auth::{AuthRouterExt, Role},
    errors::ServiceError,
    services::commerce::product_catalog_service::{
        CreateProductInput, ProductSort, UpdateProductInput,
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

/// Creates the router for product endpoints. Reads need any signed-in user,
/// mutations need an admin.
pub fn products_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .with_role(Role::User);

    let write = Router::new()
        .route("/", axum::routing::post(create_product))
        .route(
            "/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .with_role(Role::Admin);

    read.merge(write)
}

/// List products
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let products = state
        .services
        .product_catalog
        .list_products(page, params.sort_by::<ProductSort>()?, params.sort_order()?)
        .await?;

    Ok(success_response(PaginatedResponse::from(products)))
}

/// Get a product by ID
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.product_catalog.get_product(id).await?;
    Ok(success_response(product))
}

/// Create a new product
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.product_catalog.create_product(payload).await?;
    Ok(created_response(product))
}

/// Update a product
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .product_catalog
        .update_product(id, payload)
        .await?;
    Ok(success_response(product))
}

/// Soft-delete a product
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.product_catalog.delete_product(id).await?;
    Ok(no_content_response())
}
