//! Embedded file engine driver.
//!
//! Operations execute against a single SQLite database file (or an
//! in-memory database for tests). Durability of every mutating statement
//! is delegated to SQLite's own write-through journal, which replaces the
//! whole-image rewrite a naive embedded engine would do.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;

use super::{BatchOutcome, BatchStatement, DatabaseConfig, Driver, EngineKind, Row, SqlValue};
use crate::error::{AppError, AppResult};

pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Open (creating if missing) the database file and enable foreign
    /// key enforcement. In-memory databases are pinned to one connection
    /// so every statement sees the same database.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        config.validate()?;

        let options = if config.url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&config.url)
                .map_err(|e| AppError::Configuration(format!("Invalid SQLite URL: {}", e)))?
        } else {
            SqliteConnectOptions::new().filename(&config.url)
        }
        .create_if_missing(true)
        .foreign_keys(true);

        let max_connections = if config.is_memory_database() {
            1
        } else {
            config.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open SQLite database: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(n) => query.bind(*n),
            SqlValue::Real(r) => query.bind(*r),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

/// Materialize a row by pairing each column name with its value
/// positionally, using SQLite's storage class to pick the value type.
fn decode_row(row: &SqliteRow) -> AppResult<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(AppError::Sqlx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(i)?),
                "REAL" => SqlValue::Real(row.try_get(i)?),
                _ => SqlValue::Text(row.try_get(i)?),
            }
        };
        out.insert(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl Driver for SqliteDriver {
    fn kind(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<Row>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<Row>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn exec(&self, sql: &str) -> AppResult<()> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn pragma(&self, setting: &str) -> AppResult<()> {
        self.exec(&format!("PRAGMA {}", setting)).await
    }

    async fn run_batch(&self, statements: &[BatchStatement]) -> AppResult<BatchOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut affected = Vec::with_capacity(statements.len());
        for (index, statement) in statements.iter().enumerate() {
            let result = bind_params(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *tx)
                .await?;
            let rows = result.rows_affected();
            if statement.guard && rows == 0 {
                tx.rollback().await?;
                return Ok(BatchOutcome::RolledBack {
                    failed_index: index,
                });
            }
            affected.push(rows);
        }
        tx.commit().await?;
        Ok(BatchOutcome::Committed(affected))
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    fn schema_statements(&self) -> Vec<String> {
        vec![
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0 CHECK(quantity >= 0),
                min_threshold INTEGER NOT NULL DEFAULT 0 CHECK(min_threshold >= 0),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS inventory_exits (
                id TEXT PRIMARY KEY,
                product_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK(quantity > 0),
                previous_quantity INTEGER NOT NULL,
                new_quantity INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )
            "#
            .to_string(),
            "CREATE INDEX IF NOT EXISTS idx_products_user_id ON products(user_id)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_inventory_exits_product_id ON inventory_exits(product_id)"
                .to_string(),
        ]
    }
}
