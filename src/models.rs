use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Row;
use crate::error::{AppError, AppResult};

/// Closed product category set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Perfumes,
    Cremas,
    Maquillajes,
    Otros,
}

pub const VALID_CATEGORIES: [Category; 4] = [
    Category::Perfumes,
    Category::Cremas,
    Category::Maquillajes,
    Category::Otros,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Perfumes => "Perfumes",
            Category::Cremas => "Cremas",
            Category::Maquillajes => "Maquillajes",
            Category::Otros => "Otros",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        VALID_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == value)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user. The password field holds the bcrypt hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
}

impl User {
    pub fn from_row(row: &Row) -> AppResult<Self> {
        Ok(Self {
            id: row.text("id")?,
            username: row.text("username")?,
            password: row.text("password")?,
        })
    }
}

/// A product owned by exactly one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub quantity: i64,
    pub min_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Map a database row to the API shape (owner id stays internal).
    pub fn from_row(row: &Row) -> AppResult<Self> {
        let category_raw = row.text("category")?;
        let category = Category::parse(&category_raw).ok_or_else(|| {
            AppError::Database(format!("unknown product category '{}'", category_raw))
        })?;
        Ok(Self {
            id: row.text("id")?,
            name: row.text("name")?,
            description: row.opt_text("description").unwrap_or_default(),
            category,
            quantity: row.integer("quantity")?,
            min_threshold: row.integer("min_threshold")?,
            created_at: row.timestamp("created_at")?,
            updated_at: row.timestamp("updated_at")?,
        })
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_threshold
    }
}

// Request payloads arrive loosely typed so validation can report
// per-field messages instead of a serde rejection.

#[derive(Debug, Default, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<serde_json::Value>,
    pub min_threshold: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExitPayload {
    pub quantity: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    #[test]
    fn category_parse_is_exact() {
        assert_eq!(Category::parse("Perfumes"), Some(Category::Perfumes));
        assert_eq!(Category::parse("perfumes"), None);
        assert_eq!(Category::parse("Electrónica"), None);
    }

    #[test]
    fn product_from_row_maps_snake_case_columns() {
        let mut row = Row::new();
        row.insert("id", SqlValue::Text("p1".into()));
        row.insert("user_id", SqlValue::Text("u1".into()));
        row.insert("name", SqlValue::Text("Perfume X".into()));
        row.insert("description", SqlValue::Null);
        row.insert("category", SqlValue::Text("Perfumes".into()));
        row.insert("quantity", SqlValue::Integer(10));
        row.insert("min_threshold", SqlValue::Integer(2));
        row.insert(
            "created_at",
            SqlValue::Text("2026-08-29T10:00:00+00:00".into()),
        );
        row.insert(
            "updated_at",
            SqlValue::Text("2026-08-29T10:00:00+00:00".into()),
        );

        let product = Product::from_row(&row).unwrap();
        assert_eq!(product.name, "Perfume X");
        assert_eq!(product.description, "");
        assert_eq!(product.min_threshold, 2);
        assert!(!product.is_low_stock());
    }

    #[test]
    fn product_from_row_rejects_unknown_category() {
        let mut row = Row::new();
        row.insert("id", SqlValue::Text("p1".into()));
        row.insert("name", SqlValue::Text("X".into()));
        row.insert("category", SqlValue::Text("Juguetes".into()));
        assert!(Product::from_row(&row).is_err());
    }

    #[test]
    fn low_stock_is_inclusive() {
        let mut row = Row::new();
        row.insert("id", SqlValue::Text("p1".into()));
        row.insert("name", SqlValue::Text("X".into()));
        row.insert("description", SqlValue::Null);
        row.insert("category", SqlValue::Text("Otros".into()));
        row.insert("quantity", SqlValue::Integer(2));
        row.insert("min_threshold", SqlValue::Integer(2));
        row.insert(
            "created_at",
            SqlValue::Text("2026-08-29T10:00:00+00:00".into()),
        );
        row.insert(
            "updated_at",
            SqlValue::Text("2026-08-29T10:00:00+00:00".into()),
        );
        let product = Product::from_row(&row).unwrap();
        assert!(product.is_low_stock());
    }
}
