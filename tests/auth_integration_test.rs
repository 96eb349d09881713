mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::auth::Role;

#[tokio::test]
async fn register_then_login_issues_a_user_token() {
    let app = TestApp::new().await;

    let (status, user) = app
        .send(
            Method::POST,
            "/api/v1/users/register",
            Some(json!({
                "username": "new_shopper",
                "email": "new.shopper@example.com",
                "password": "a-long-password",
                "name": "New Shopper"
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "user");
    assert!(user.get("password_hash").is_none());
    assert!(user["customer_id"].is_string());
    assert_ne!(user["customer_id"], json!(app.customer.id));

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            Some(json!({ "username": "new_shopper", "password": "a-long-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().unwrap();
    let claims = app.state.auth.verify_token(token).unwrap();
    assert_eq!(claims.sub, user["id"].as_str().unwrap());
    assert_eq!(claims.role, Role::User.to_string());

    // The fresh token reaches a cart of its own
    let (status, cart) = app
        .send(Method::GET, "/api/v1/shopping_cart", None, Some(token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"]["pagination"]["total"], 0);

    let (status, customer) = app
        .send(
            Method::GET,
            &format!("/api/v1/customers/{}", user["customer_id"].as_str().unwrap()),
            None,
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customer["name"], "New Shopper");
    assert_eq!(customer["email"], "new.shopper@example.com");
}

#[tokio::test]
async fn registration_cannot_claim_an_existing_customer() {
    let app = TestApp::new().await;
    let product = app.seed_product("Victim Lamp", dec!(12.00), 5).await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/shopping_cart",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            Some(&app.user_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, user) = app
        .send(
            Method::POST,
            "/api/v1/users/register",
            Some(json!({
                "username": "intruder",
                "email": "intruder@example.com",
                "password": "a-long-password",
                "customer_id": app.customer.id
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(user["customer_id"], json!(app.customer.id));

    let (_, body) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            Some(json!({ "username": "intruder", "password": "a-long-password" })),
            None,
        )
        .await;
    let (status, cart) = app
        .send(
            Method::GET,
            "/api/v1/shopping_cart",
            None,
            Some(body["token"].as_str().unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"]["pagination"]["total"], 0);

    let (_, cart) = app
        .send(Method::GET, "/api/v1/shopping_cart", None, Some(&app.user_token))
        .await;
    assert_eq!(cart["lines"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn a_customer_links_to_at_most_one_user() {
    let app = TestApp::new().await;
    let (status, staff) = app
        .send(
            Method::GET,
            "/api/v1/users?sort_by=username",
            None,
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let admin_id = staff["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|user| user["username"] == "admin_user")
        .map(|user| user["id"].as_str().unwrap().to_string())
        .unwrap();

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", admin_id),
            Some(json!({ "customer_id": app.customer.id })),
            Some(&app.super_admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Re-linking the current owner is a no-op, and a free customer can be linked
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", app.shopper.id),
            Some(json!({ "customer_id": app.customer.id })),
            Some(&app.super_admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let free = app.seed_customer("Walk In").await;
    let (status, linked) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", admin_id),
            Some(json!({ "customer_id": free.id })),
            Some(&app.super_admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["customer_id"], json!(free.id));
}

#[tokio::test]
async fn login_with_bad_credentials_is_unauthenticated() {
    let app = TestApp::new().await;

    for (username, password) in [("shopper", "wrong-password"), ("nobody", "whatever-pass")] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/v1/users/login",
                Some(json!({ "username": username, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users/register",
            Some(json!({ "username": "x", "email": "bad", "password": "short" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users/register",
            Some(json!({
                "username": "shopper",
                "email": "another@example.com",
                "password": "a-long-password"
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleted_users_cannot_log_in() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/users/{}", app.shopper.id),
            None,
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            Some(json!({ "username": "shopper", "password": "correct-horse-battery" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Tokens issued before the deletion no longer resolve to a cart
    let (status, _) = app
        .send(Method::GET, "/api/v1/shopping_cart", None, Some(&app.user_token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_are_listed_and_sorted_for_admins() {
    let app = TestApp::new().await;

    let (status, page) = app
        .send(
            Method::GET,
            "/api/v1/users?sort_by=username&sort_order=desc",
            None,
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["shopper", "root_user", "admin_user"]);

    let (status, user) = app
        .send(
            Method::GET,
            &format!("/api/v1/users/{}", app.shopper.id),
            None,
            Some(&app.admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["customer_id"], json!(app.customer.id));
}

#[tokio::test]
async fn bootstrap_admin_runs_once() {
    let app = TestApp::new().await;
    let users = app.state.services.user.clone();

    assert!(users
        .bootstrap_admin("ops_root", "bootstrap-password", None)
        .await
        .unwrap());
    assert!(!users
        .bootstrap_admin("ops_root", "bootstrap-password", None)
        .await
        .unwrap());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/users/login",
            Some(json!({ "username": "ops_root", "password": "bootstrap-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let claims = app
        .state
        .auth
        .verify_token(body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.role, "super_admin");
}
