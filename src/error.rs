use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Sqlx(sqlx::Error),
    Validation {
        message: String,
        details: BTreeMap<String, String>,
    },
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Configuration(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Sqlx(e) => write!(f, "Database driver error: {}", e),
            AppError::Validation { message, .. } => write!(f, "Validation error: {}", message),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Sqlx(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Sqlx(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn to_response(&self) -> (StatusCode, Json<serde_json::Value>) {
        match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Validation Error",
                    "message": message,
                    "details": details,
                })),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": message,
                })),
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not Found",
                    "message": message,
                })),
            ),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Bad Request",
                    "message": message,
                })),
            ),
            AppError::Database(_)
            | AppError::Sqlx(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "internal error");
                let body = if cfg!(debug_assertions) {
                    json!({
                        "error": "Internal Server Error",
                        "message": "Ocurrió un error en el servidor",
                        "details": self.to_string(),
                    })
                } else {
                    json!({
                        "error": "Internal Server Error",
                        "message": "Ocurrió un error en el servidor",
                    })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400_with_details() {
        let mut details = BTreeMap::new();
        details.insert("name".to_string(), "El nombre es requerido".to_string());
        let err = AppError::Validation {
            message: "Los datos proporcionados no son válidos".to_string(),
            details,
        };
        let (status, Json(body)) = err.to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation Error");
        assert_eq!(body["details"]["name"], "El nombre es requerido");
    }

    #[test]
    fn not_found_carries_message() {
        let err = AppError::NotFound("Producto no encontrado".to_string());
        let (status, Json(body)) = err.to_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Producto no encontrado");
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let err = AppError::Unauthorized("Credenciales inválidas".to_string());
        let (status, _) = err.to_response();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
