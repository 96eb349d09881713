use crate::{
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, ListParams, PaginatedResponse,
    },
    services::users::{LoginInput, RegisterUserInput, UpdateUserInput, UserSort},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Self-registration; always creates a `user` owning a fresh customer.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.user.register(payload).await?;
    Ok(created_response(user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state.services.user.login(payload).await?;
    Ok(success_response(TokenResponse { token }))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = params.page_request(&state.config)?;
    let users = state
        .services
        .user
        .list_users(page, params.sort_by::<UserSort>()?, params.sort_order()?)
        .await?;
    Ok(success_response(PaginatedResponse::from(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.user.get_user(id).await?;
    Ok(success_response(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.user.update_user(id, payload).await?;
    Ok(success_response(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.user.delete_user(id).await?;
    Ok(no_content_response())
}
