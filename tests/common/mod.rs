use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};

use fibia_server::config::AppConfig;
use fibia_server::db::{schema, Database, DatabaseConfig, DriverFactory};
use fibia_server::handlers;
use fibia_server::state::AppState;

/// Spin up the full router over a fresh in-memory SQLite database with
/// the schema bootstrapped and the default admin seeded.
pub async fn setup_test_app() -> (TestServer, Database) {
    let mut config = AppConfig::default_config();
    config.database.engine = "sqlite".to_string();
    config.database.url = ":memory:".to_string();

    let db = DriverFactory::create(&DatabaseConfig::memory_sqlite())
        .await
        .expect("in-memory database should open");
    schema::bootstrap(&db).await.expect("bootstrap should succeed");

    let state = AppState::new(db.clone(), Arc::new(config));
    let server = TestServer::new(handlers::router(state)).expect("router should build");
    (server, db)
}

/// Log in as the seeded admin and return the bearer token.
pub async fn login_as_admin(server: &TestServer) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "fibiadmin", "password": "fibi2026" }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    body["token"].as_str().expect("token in login response").to_string()
}

/// Create a product through the API and return its id.
pub async fn create_product(server: &TestServer, token: &str, body: Value) -> String {
    let response = server
        .post("/api/products")
        .authorization_bearer(token)
        .json(&body)
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let created: Value = response.json();
    created["id"].as_str().expect("product id").to_string()
}
