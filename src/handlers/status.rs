use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::db::EngineKind;
use crate::error::AppResult;
use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Variedades Fibia Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "dbStatus": "/api/db/status",
            "login": "POST /api/auth/login",
            "products": "/api/products",
        },
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database_ok = state.db.health_check().await.is_ok();
    Json(json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "message": "Servidor funcionando correctamente",
        "database": database_ok,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/db/status
///
/// Engine identity plus row counts; for the sqlite engine also reports
/// the database file location and on-disk size when it exists.
pub async fn db_status(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let connected = state.db.health_check().await.is_ok();

    let mut body = json!({
        "engine": state.db.kind().as_str(),
        "connected": connected,
        "timestamp": Utc::now().to_rfc3339(),
    });

    if connected {
        let users = count(&state, "users").await?;
        let products = count(&state, "products").await?;
        body["counts"] = json!({ "users": users, "products": products });
    }

    if state.db.kind() == EngineKind::Sqlite {
        let path = sqlite_file_path(&state.config.database.url);
        if let Some(path) = path {
            let size = std::fs::metadata(&path).map(|m| m.len()).ok();
            body["file"] = json!({ "path": path, "sizeBytes": size });
        }
    }

    Ok(Json(body))
}

async fn count(state: &AppState, table: &str) -> AppResult<i64> {
    let row = state
        .db
        .prepare(&format!("SELECT COUNT(*) AS total FROM {}", table))
        .get(&[])
        .await?;
    Ok(row.and_then(|r| r.integer("total").ok()).unwrap_or(0))
}

/// A `sqlite:` URL names a file unless it is the in-memory database.
fn sqlite_file_path(url: &str) -> Option<String> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")).unwrap_or(url);
    if path == ":memory:" || path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_file_path_strips_scheme() {
        assert_eq!(
            sqlite_file_path("sqlite:database.sqlite"),
            Some("database.sqlite".to_string())
        );
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/fibia.db"),
            Some("/var/lib/fibia.db".to_string())
        );
    }

    #[test]
    fn sqlite_file_path_skips_memory() {
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
    }
}
