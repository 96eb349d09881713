//! Storefront API Library
//!
//! Catalog, customers, shopping carts, checkout and orders behind a
//! role-guarded REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService, Role};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service over one pool.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from_app_config(&config)));
        let services = handlers::AppServices::new(db.clone(), auth.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    // Users: registration and login are public
    let users_public = Router::new()
        .route("/users/register", post(handlers::users::register))
        .route("/users/login", post(handlers::users::login));

    let users_admin = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route(
            "/users/:id",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        .with_role(Role::Admin);

    let users_super_admin = Router::new()
        .route("/users/:id", put(handlers::users::update_user))
        .with_role(Role::SuperAdmin);

    // Orders: shoppers place orders, staff manage them
    let orders_create = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .with_exact_role(Role::User);

    let orders_admin = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route(
            "/orders/:id",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .with_role(Role::Admin);

    let customers = Router::new()
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .with_role(Role::Admin);

    Router::new()
        .merge(users_public)
        .merge(users_admin)
        .merge(users_super_admin)
        .merge(orders_create)
        .merge(orders_admin)
        .merge(customers)
        // Commerce API (catalog, accounts, cart and checkout)
        .nest("/products", handlers::commerce::products_routes())
        .nest("/categories", handlers::commerce::categories_routes())
        .nest(
            "/customer_accounts",
            handlers::commerce::customer_accounts_routes(),
        )
        .nest("/shopping_cart", handlers::commerce::carts_routes())
}

/// Full application router: `/health` plus the versioned API. The auth
/// service is attached to every API request for the guard middleware.
pub fn build_router(state: AppState) -> Router {
    let api = api_v1_routes().layer(axum::middleware::from_fn_with_state(
        state.auth.clone(),
        auth::auth_service_middleware,
    ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api)
        .with_state(state)
}
