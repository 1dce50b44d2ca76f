use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Database, Row, SqlValue};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, AuthUser};
use crate::models::{Product, ProductPayload};
use crate::state::AppState;
use crate::validation::validate_product;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

/// Fetch a product scoped to its owner; ownership misses and absent ids
/// are indistinguishable (404).
async fn find_owned_product(db: &Database, id: &str, user_id: &str) -> AppResult<Option<Row>> {
    db.prepare("SELECT * FROM products WHERE id = ? AND user_id = ?")
        .get(&[id.into(), user_id.into()])
        .await
}

fn product_not_found() -> AppError {
    AppError::NotFound("Producto no encontrado".to_string())
}

/// GET /api/products?search=
pub async fn get_all_products(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Value>> {
    let mut sql = "SELECT * FROM products WHERE user_id = ?".to_string();
    let mut bind_values: Vec<SqlValue> = vec![auth.user_id.clone().into()];

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND name LIKE ?");
        bind_values.push(format!("%{}%", search).into());
    }
    sql.push_str(" ORDER BY name ASC");

    let rows = state.db.prepare(&sql).all(&bind_values).await?;
    let products = rows
        .iter()
        .map(Product::from_row)
        .collect::<AppResult<Vec<_>>>()?;

    let low_stock_count = products.iter().filter(|p| p.is_low_stock()).count();
    Ok(Json(json!({
        "products": products,
        "total": products.len(),
        "lowStockCount": low_stock_count,
    })))
}

/// GET /api/products/:id
pub async fn get_product_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let row = find_owned_product(&state.db, &id, &auth.user_id)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(Product::from_row(&row)?))
}

/// POST /api/products
pub async fn create_product(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProductPayload>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let validated = validate_product(&payload)?;

    let product_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    state
        .db
        .prepare(
            "INSERT INTO products \
             (id, user_id, name, description, category, quantity, min_threshold, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .run(&[
            product_id.clone().into(),
            auth.user_id.clone().into(),
            validated.name.into(),
            validated.description.into(),
            validated.category.as_str().into(),
            validated.quantity.into(),
            validated.min_threshold.into(),
            now.into(),
            now.into(),
        ])
        .await?;

    let row = state
        .db
        .prepare("SELECT * FROM products WHERE id = ?")
        .get(&[product_id.into()])
        .await?
        .ok_or_else(|| AppError::Internal("created product not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(Product::from_row(&row)?)))
}

/// PUT|PATCH /api/products/:id — full replacement either way.
pub async fn update_product(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ProductPayload>,
) -> AppResult<Json<Product>> {
    let validated = validate_product(&payload)?;

    find_owned_product(&state.db, &id, &auth.user_id)
        .await?
        .ok_or_else(product_not_found)?;

    let now = Utc::now();
    state
        .db
        .prepare(
            "UPDATE products \
             SET name = ?, description = ?, category = ?, quantity = ?, min_threshold = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .run(&[
            validated.name.into(),
            validated.description.into(),
            validated.category.as_str().into(),
            validated.quantity.into(),
            validated.min_threshold.into(),
            now.into(),
            id.clone().into(),
            auth.user_id.clone().into(),
        ])
        .await?;

    let row = state
        .db
        .prepare("SELECT * FROM products WHERE id = ?")
        .get(&[id.into()])
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(Product::from_row(&row)?))
}

/// DELETE /api/products/:id
pub async fn delete_product(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    find_owned_product(&state.db, &id, &auth.user_id)
        .await?
        .ok_or_else(product_not_found)?;

    state
        .db
        .prepare("DELETE FROM products WHERE id = ? AND user_id = ?")
        .run(&[id.into(), auth.user_id.clone().into()])
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
