use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{BatchOutcome, BatchStatement};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, AuthUser};
use crate::models::{ExitPayload, Product};
use crate::state::AppState;
use crate::validation::validate_exit;

/// POST /api/products/:id/exit
///
/// Decrements stock and appends the audit row in one atomic unit. The
/// UPDATE is a compare-and-set on the quantity read in step 1, so two
/// concurrent exits can never both pass the sufficiency check: the loser
/// rolls back (audit row included) and gets the insufficient-stock
/// rejection.
pub async fn register_exit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<ExitPayload>,
) -> AppResult<Json<Value>> {
    let exit = validate_exit(&payload)?;

    let row = state
        .db
        .prepare("SELECT * FROM products WHERE id = ? AND user_id = ?")
        .get(&[id.clone().into(), auth.user_id.clone().into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Producto no encontrado".to_string()))?;
    let product = Product::from_row(&row)?;

    if exit.quantity > product.quantity {
        return Err(AppError::BadRequest(
            "La cantidad a descontar es mayor que el stock disponible".to_string(),
        ));
    }

    let previous_quantity = product.quantity;
    let new_quantity = previous_quantity - exit.quantity;
    let is_low_stock = new_quantity <= product.min_threshold;
    let now = Utc::now();
    let exit_id = Uuid::new_v4().to_string();

    let outcome = state
        .db
        .transaction(&[
            BatchStatement::guarded(
                "UPDATE products SET quantity = ?, updated_at = ? \
                 WHERE id = ? AND user_id = ? AND quantity = ?",
                vec![
                    new_quantity.into(),
                    now.into(),
                    id.clone().into(),
                    auth.user_id.clone().into(),
                    previous_quantity.into(),
                ],
            ),
            BatchStatement::new(
                "INSERT INTO inventory_exits \
                 (id, product_id, user_id, quantity, previous_quantity, new_quantity, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    exit_id.into(),
                    id.clone().into(),
                    auth.user_id.clone().into(),
                    exit.quantity.into(),
                    previous_quantity.into(),
                    new_quantity.into(),
                    now.into(),
                ],
            ),
        ])
        .await?;

    if let BatchOutcome::RolledBack { .. } = outcome {
        // Lost the compare-and-set: stock moved underneath us.
        return Err(AppError::BadRequest(
            "La cantidad a descontar es mayor que el stock disponible".to_string(),
        ));
    }

    let updated_row = state
        .db
        .prepare("SELECT * FROM products WHERE id = ?")
        .get(&[id.into()])
        .await?
        .ok_or_else(|| AppError::NotFound("Producto no encontrado".to_string()))?;
    let updated = Product::from_row(&updated_row)?;

    Ok(Json(json!({
        "product": {
            "id": updated.id,
            "name": updated.name,
            "quantity": updated.quantity,
            "minThreshold": updated.min_threshold,
        },
        "exitQuantity": exit.quantity,
        "newQuantity": new_quantity,
        "isLowStock": is_low_stock,
        "timestamp": now.to_rfc3339(),
    })))
}
