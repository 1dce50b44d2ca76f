mod common;

use serde_json::{json, Value};

use common::{login_as_admin, setup_test_app};

#[tokio::test]
async fn login_with_seeded_admin_returns_token_and_user() {
    let (server, _db) = setup_test_app().await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "fibiadmin", "password": "fibi2026" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "fibiadmin");
    assert!(body["user"]["id"].as_str().is_some());
    // The hash must never leave the server.
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_get_the_same_401() {
    let (server, _db) = setup_test_app().await;

    let wrong_password = server
        .post("/api/auth/login")
        .json(&json!({ "username": "fibiadmin", "password": "nope" }))
        .await;
    assert_eq!(wrong_password.status_code(), 401);

    let unknown_user = server
        .post("/api/auth/login")
        .json(&json!({ "username": "ghost", "password": "nope" }))
        .await;
    assert_eq!(unknown_user.status_code(), 401);

    let a: Value = wrong_password.json();
    let b: Value = unknown_user.json();
    assert_eq!(a["message"], "Credenciales inválidas");
    assert_eq!(a, b);
}

#[tokio::test]
async fn login_validates_missing_fields() {
    let (server, _db) = setup_test_app().await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "fibiadmin" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation Error");
    assert!(body["details"]["password"].as_str().is_some());
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let (server, _db) = setup_test_app().await;

    let no_token = server.get("/api/products").await;
    assert_eq!(no_token.status_code(), 401);
    let body: Value = no_token.json();
    assert_eq!(body["message"], "Token de autenticación requerido");

    let garbage = server
        .get("/api/products")
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(garbage.status_code(), 401);
}

#[tokio::test]
async fn issued_token_grants_access() {
    let (server, _db) = setup_test_app().await;
    let token = login_as_admin(&server).await;

    let response = server
        .get("/api/products")
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["total"], 0);
}
