pub mod commerce;
pub mod common;
pub mod customers;
pub mod health;
pub mod orders;
pub mod users;

use crate::{
    auth::AuthService,
    db::DbPool,
    services::{
        commerce::{CartService, CheckoutService, CustomerService, ProductCatalogService},
        CustomerLocks, OrderService, UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub customer: Arc<CustomerService>,
    pub order: Arc<OrderService>,
    pub user: Arc<UserService>,
}

impl AppServices {
    /// Builds every service over one pool. Cart and checkout share the
    /// per-customer locks so they serialize against each other.
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>) -> Self {
        let locks = CustomerLocks::new();

        Self {
            product_catalog: Arc::new(ProductCatalogService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone(), locks.clone())),
            checkout: Arc::new(CheckoutService::new(db_pool.clone(), locks)),
            customer: Arc::new(CustomerService::new(db_pool.clone())),
            order: Arc::new(OrderService::new(db_pool.clone())),
            user: Arc::new(UserService::new(db_pool, auth_service)),
        }
    }
}
