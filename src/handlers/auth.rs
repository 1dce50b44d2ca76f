use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::extractors::AppJson;
use crate::models::{LoginPayload, User};
use crate::password;
use crate::state::AppState;
use crate::validation::validate_login;

/// POST /api/auth/login
///
/// Unknown username and wrong password produce the same generic 401 so
/// the response leaks nothing about which usernames exist.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginPayload>,
) -> AppResult<Json<Value>> {
    let credentials = validate_login(&payload)?;

    let row = state
        .db
        .prepare("SELECT * FROM users WHERE username = ?")
        .get(&[credentials.username.clone().into()])
        .await?;

    let user = match row {
        Some(row) => User::from_row(&row)?,
        None => return Err(AppError::Unauthorized("Credenciales inválidas".to_string())),
    };

    if !password::verify_password(&credentials.password, &user.password)? {
        return Err(AppError::Unauthorized("Credenciales inválidas".to_string()));
    }

    let token = state.jwt.sign(&user.id, &user.username)?;
    Ok(Json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
        },
    })))
}
