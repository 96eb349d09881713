use crate::{
    config::AppConfig,
    errors::ServiceError,
    repositories::{parse_sort_field, Page, PageRequest, SortOrder},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Query parameters shared by every list endpoint
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    /// Validated page request, bounded by the configured page sizes.
    pub fn page_request(&self, config: &AppConfig) -> Result<PageRequest, ServiceError> {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(config.api_default_page_size),
            config.api_max_page_size,
        )
    }

    pub fn sort_by<T: FromStr + Default>(&self) -> Result<T, ServiceError> {
        parse_sort_field(self.sort_by.as_deref(), T::default())
    }

    pub fn sort_order(&self) -> Result<SortOrder, ServiceError> {
        self.sort_order
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let pagination = PaginationMeta {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            data: page.items,
            pagination,
        }
    }
}
