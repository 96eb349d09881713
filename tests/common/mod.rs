#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use storefront_api::{
    auth::{hash_password, Role},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        commerce::{CustomerModel, ProductModel},
        user, UserModel,
    },
    services::{
        commerce::{
            customer_service::CreateCustomerInput, product_catalog_service::CreateProductInput,
        },
        users::RegisterUserInput,
    },
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_value_with_plenty_of_entropy_0123456789_ABCDEFGHIJ";

/// Helper harness for spinning up the full application over a throwaway
/// SQLite database.
///
/// Seeds one user per role. The `user` login registers like any shopper, so
/// it owns the seeded customer and its token operates on that customer's
/// cart. Staff logins have no customer.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub customer: CustomerModel,
    pub shopper: UserModel,
    pub user_token: String,
    pub admin_token: String,
    pub super_admin_token: String,
    pub database_url: String,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("storefront_test.db");

        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let mut cfg = AppConfig::new(
            database_url.clone(),
            TEST_JWT_SECRET.to_string(),
            7,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = storefront_api::build_router(state.clone());

        let (shopper, customer) = register_shopper(&state, "shopper", "Test Shopper").await;
        let admin = seed_staff(&state, "admin_user", Role::Admin).await;
        let super_admin = seed_staff(&state, "root_user", Role::SuperAdmin).await;

        let user_token = state
            .auth
            .issue_token(&shopper.id.to_string(), Role::User)
            .expect("issue user token");
        let admin_token = state
            .auth
            .issue_token(&admin.id.to_string(), Role::Admin)
            .expect("issue admin token");
        let super_admin_token = state
            .auth
            .issue_token(&super_admin.id.to_string(), Role::SuperAdmin)
            .expect("issue super admin token");

        Self {
            router,
            state,
            customer,
            shopper,
            user_token,
            admin_token,
            super_admin_token,
            database_url,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the decoded JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// A second, independent pool on the same database, standing in for
    /// another server process.
    pub async fn separate_pool(&self, max_connections: u32) -> Arc<DatabaseConnection> {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: self.database_url.clone(),
            max_connections,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("open a second pool");
        Arc::new(pool)
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> ProductModel {
        self.state
            .services
            .product_catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                description: Some(format!("{} seeded for tests", name)),
                price,
                stock_quantity: stock,
                category_id: None,
            })
            .await
            .expect("seed product for tests")
    }

    pub async fn seed_customer(&self, name: &str) -> CustomerModel {
        self.state
            .services
            .customer
            .create_customer(CreateCustomerInput {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                phone: None,
            })
            .await
            .expect("seed customer for tests")
    }

    /// Registers another shopper and returns their customer and token.
    pub async fn second_shopper(&self, name: &str) -> (CustomerModel, String) {
        let username = name.to_lowercase().replace(' ', "_");
        let (user, customer) = register_shopper(&self.state, &username, name).await;
        let token = self
            .state
            .auth
            .issue_token(&user.id.to_string(), Role::User)
            .expect("issue token");
        (customer, token)
    }
}

pub async fn register_shopper(
    state: &AppState,
    username: &str,
    name: &str,
) -> (UserModel, CustomerModel) {
    let user = state
        .services
        .user
        .register(RegisterUserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "correct-horse-battery".to_string(),
            name: Some(name.to_string()),
        })
        .await
        .expect("register seeded shopper");
    let customer_id = user.customer_id.expect("registration links a customer");
    let customer = state
        .services
        .customer
        .get_customer(customer_id)
        .await
        .expect("registered customer exists");
    (user, customer)
}

async fn seed_staff(state: &AppState, username: &str, role: Role) -> UserModel {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set(hash_password("correct-horse-battery").expect("hash password")),
        role: Set(role),
        customer_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&*state.db)
    .await
    .expect("insert seeded staff user")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is json")
    }
}

/// Money fields serialize as strings; compare them numerically since SQLite
/// may not keep the scale.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {}", other),
    }
}
