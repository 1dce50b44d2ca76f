//! Request-body validation with per-field error messages.

use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};
use crate::models::{Category, ExitPayload, LoginPayload, ProductPayload, VALID_CATEGORIES};

#[derive(Debug, Clone)]
pub struct ValidatedLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ValidatedProduct {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub quantity: i64,
    pub min_threshold: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct ValidatedExit {
    pub quantity: i64,
}

fn validation_error(details: BTreeMap<String, String>) -> AppError {
    AppError::Validation {
        message: "Los datos proporcionados no son válidos".to_string(),
        details,
    }
}

/// Extract a non-negative integer field; rejects floats and negatives.
fn integer_field(
    value: &Option<serde_json::Value>,
    field: &str,
    min: i64,
    details: &mut BTreeMap<String, String>,
    int_message: &str,
    min_message: &str,
) -> Option<i64> {
    match value {
        Some(v) => match v.as_i64() {
            Some(n) if n >= min => Some(n),
            Some(_) => {
                details.insert(field.to_string(), min_message.to_string());
                None
            }
            None => {
                details.insert(field.to_string(), int_message.to_string());
                None
            }
        },
        None => {
            details.insert(field.to_string(), int_message.to_string());
            None
        }
    }
}

pub fn validate_login(payload: &LoginPayload) -> AppResult<ValidatedLogin> {
    let mut details = BTreeMap::new();

    let username = payload.username.clone().unwrap_or_default();
    if username.is_empty() {
        details.insert("username".to_string(), "El usuario es requerido".to_string());
    }
    let password = payload.password.clone().unwrap_or_default();
    if password.is_empty() {
        details.insert(
            "password".to_string(),
            "La contraseña es requerida".to_string(),
        );
    }

    if !details.is_empty() {
        return Err(validation_error(details));
    }
    Ok(ValidatedLogin { username, password })
}

pub fn validate_product(payload: &ProductPayload) -> AppResult<ValidatedProduct> {
    let mut details = BTreeMap::new();

    let name = payload.name.clone().unwrap_or_default();
    if name.is_empty() {
        details.insert("name".to_string(), "El nombre es requerido".to_string());
    } else if name.chars().count() > 255 {
        details.insert(
            "name".to_string(),
            "El nombre no puede exceder 255 caracteres".to_string(),
        );
    }

    let description = payload.description.clone().unwrap_or_default();
    if description.chars().count() > 1000 {
        details.insert(
            "description".to_string(),
            "La descripción no puede exceder 1000 caracteres".to_string(),
        );
    }

    let category = match payload.category.as_deref().and_then(Category::parse) {
        Some(category) => Some(category),
        None => {
            let names: Vec<&str> = VALID_CATEGORIES.iter().map(|c| c.as_str()).collect();
            details.insert(
                "category".to_string(),
                format!("La categoría debe ser una de: {}", names.join(", ")),
            );
            None
        }
    };

    let quantity = integer_field(
        &payload.quantity,
        "quantity",
        0,
        &mut details,
        "La cantidad debe ser un número entero",
        "La cantidad debe ser mayor o igual a 0",
    );
    let min_threshold = integer_field(
        &payload.min_threshold,
        "minThreshold",
        0,
        &mut details,
        "El umbral mínimo debe ser un número entero",
        "El umbral mínimo debe ser mayor o igual a 0",
    );

    if !details.is_empty() {
        return Err(validation_error(details));
    }
    Ok(ValidatedProduct {
        name,
        description,
        category: category.unwrap(),
        quantity: quantity.unwrap(),
        min_threshold: min_threshold.unwrap(),
    })
}

pub fn validate_exit(payload: &ExitPayload) -> AppResult<ValidatedExit> {
    let mut details = BTreeMap::new();
    let quantity = integer_field(
        &payload.quantity,
        "quantity",
        1,
        &mut details,
        "La cantidad debe ser un número entero",
        "La cantidad debe ser mayor a 0",
    );
    if !details.is_empty() {
        return Err(validation_error(details));
    }
    Ok(ValidatedExit {
        quantity: quantity.unwrap(),
    })
}
