use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::logging::logging_middleware;
use crate::state::AppState;

pub mod auth;
pub mod inventory;
pub mod products;
pub mod status;

/// Build the full application router against an initialized backend.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(
            state
                .config
                .cors
                .origin
                .parse()
                .unwrap_or_else(|_| "http://localhost:3000".parse().unwrap()),
        ))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status::root))
        .route("/health", get(status::health))
        .route("/api/db/status", get(status::db_status))
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/products",
            get(products::get_all_products).post(products::create_product),
        )
        .route(
            "/api/products/:id",
            get(products::get_product_by_id)
                .put(products::update_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/products/:id/exit", post(inventory::register_exit))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(state)
}
