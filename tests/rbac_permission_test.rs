mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::auth::Role;
use test_case::test_case;

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "up" }));
}

#[test_case("/api/v1/shopping_cart" ; "cart")]
#[test_case("/api/v1/products" ; "products")]
#[test_case("/api/v1/categories" ; "categories")]
#[test_case("/api/v1/orders" ; "orders")]
#[test_case("/api/v1/users" ; "users")]
#[test_case("/api/v1/customers" ; "customers")]
#[test_case("/api/v1/customer_accounts" ; "customer accounts")]
#[tokio::test]
async fn protected_routes_reject_missing_tokens(uri: &str) {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_authorization_headers_are_unauthenticated() {
    let app = TestApp::new().await;

    for header in [
        format!("Token {}", app.user_token),
        format!("Bearer {} extra", app.user_token),
        "Bearer".to_string(),
        "Bearer not-a-jwt".to_string(),
    ] {
        let request = axum::http::Request::builder()
            .uri("/api/v1/products")
            .header("authorization", header)
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(
            storefront_api::build_router(app.state.clone()),
            request,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let app = TestApp::new().await;
    let issued = Utc::now() - Duration::days(8);
    let token = app
        .state
        .auth
        .issue_token_at(&app.shopper.id.to_string(), "user", issued)
        .unwrap();

    let (status, body) = app
        .send(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has expired");
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let app = TestApp::new().await;
    let foreign = storefront_api::auth::AuthService::new(storefront_api::auth::AuthConfig::new(
        "a_completely_different_secret_that_is_also_long_enough_0123456789_xyz".to_string(),
        7,
    ));
    let token = foreign
        .issue_token(&app.shopper.id.to_string(), Role::SuperAdmin)
        .unwrap();

    let (status, _) = app
        .send(Method::GET, "/api/v1/users", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_roles_are_denied() {
    let app = TestApp::new().await;
    let token = app
        .state
        .auth
        .issue_token_at(&app.shopper.id.to_string(), "guest", Utc::now())
        .unwrap();

    let (status, _) = app
        .send(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_hierarchy_on_staff_routes() {
    let app = TestApp::new().await;
    let matrix = [
        ("/api/v1/users", &app.user_token, StatusCode::FORBIDDEN),
        ("/api/v1/users", &app.admin_token, StatusCode::OK),
        ("/api/v1/users", &app.super_admin_token, StatusCode::OK),
        ("/api/v1/orders", &app.user_token, StatusCode::FORBIDDEN),
        ("/api/v1/orders", &app.admin_token, StatusCode::OK),
        ("/api/v1/customers", &app.user_token, StatusCode::FORBIDDEN),
        ("/api/v1/customers", &app.super_admin_token, StatusCode::OK),
        ("/api/v1/customer_accounts", &app.user_token, StatusCode::FORBIDDEN),
        ("/api/v1/customer_accounts", &app.admin_token, StatusCode::OK),
        ("/api/v1/products", &app.user_token, StatusCode::OK),
        ("/api/v1/categories", &app.user_token, StatusCode::OK),
    ];

    for (uri, token, expected) in matrix {
        let (status, _) = app.send(Method::GET, uri, None, Some(token)).await;
        assert_eq!(status, expected, "GET {} with {:?}", uri, token);
    }
}

#[tokio::test]
async fn catalog_mutations_need_admin() {
    let app = TestApp::new().await;
    let body = json!({ "name": "Lamp", "price": "12.50", "stock_quantity": 3 });

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(body.clone()),
            Some(&app.user_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(body),
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/products/{}", created["id"].as_str().unwrap());
    let (status, _) = app
        .send(Method::DELETE, &uri, None, Some(&app.user_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn updating_users_needs_super_admin() {
    let app = TestApp::new().await;
    let uri = format!("/api/v1/users/{}", app.shopper.id);
    let body = json!({ "role": "admin" });

    let (status, _) = app
        .send(Method::PUT, &uri, Some(body.clone()), Some(&app.admin_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(body), Some(&app.super_admin_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "admin");
}

#[tokio::test]
async fn placing_orders_is_reserved_for_shoppers() {
    let app = TestApp::new().await;
    let product = app.seed_product("Widget", dec!(5.00), 10).await;
    let body = json!({
        "customer_id": app.customer.id,
        "order_items": [
            { "product_id": product.id, "quantity": 1, "price_at_order": "5.00" }
        ]
    });

    // Higher roles do not inherit this one
    for token in [&app.admin_token, &app.super_admin_token] {
        let (status, _) = app
            .send(Method::POST, "/api/v1/orders", Some(body.clone()), Some(token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/orders",
            Some(body),
            Some(&app.user_token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn cart_routes_need_a_linked_customer() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/api/v1/shopping_cart", None, Some(&app.user_token))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Staff pass the guard but have no customer of their own
    let (status, _) = app
        .send(Method::GET, "/api/v1/shopping_cart", None, Some(&app.admin_token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
