//! MySQL client/server engine driver.
//!
//! Statements pass through unchanged: MySQL already speaks the facade's
//! `?` positional placeholder convention. Requests multiplex over a
//! bounded connection pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySqlPool, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

use super::{BatchOutcome, BatchStatement, DatabaseConfig, Driver, EngineKind, Row, SqlValue};
use crate::error::{AppError, AppResult};

pub struct MySqlDriver {
    pool: MySqlPool,
}

impl MySqlDriver {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        config.validate()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MySQL: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(n) => query.bind(*n),
            SqlValue::Real(r) => query.bind(*r),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(ts) => query.bind(ts.naive_utc()),
        };
    }
    query
}

/// Rows arrive already keyed; map MySQL's column types onto the facade's
/// value enum. DATETIME columns are stored and read as UTC.
fn decode_row(row: &MySqlRow) -> AppResult<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(AppError::Sqlx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "TINYINT UNSIGNED"
                | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BOOLEAN" => {
                    SqlValue::Integer(row.try_get::<i64, _>(i)?)
                }
                "BIGINT UNSIGNED" => SqlValue::Integer(row.try_get::<u64, _>(i)? as i64),
                "FLOAT" | "DOUBLE" => SqlValue::Real(row.try_get::<f64, _>(i)?),
                "DATETIME" | "TIMESTAMP" => {
                    let naive: NaiveDateTime = row.try_get(i)?;
                    SqlValue::Timestamp(DateTime::from_naive_utc_and_offset(naive, Utc))
                }
                _ => SqlValue::Text(row.try_get(i)?),
            }
        };
        out.insert(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl Driver for MySqlDriver {
    fn kind(&self) -> EngineKind {
        EngineKind::MySql
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
        tracing::warn!(setting, "PRAGMA not supported by MySQL, ignoring");
        Ok(())
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
        ddl()
    }
}

/// Idempotent MySQL DDL; indexes ride inside the CREATE TABLE so the
/// whole set is covered by IF NOT EXISTS.
fn ddl() -> Vec<String> {
    vec![
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(36) PRIMARY KEY,
                username VARCHAR(255) UNIQUE NOT NULL,
                password VARCHAR(255) NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id VARCHAR(36) PRIMARY KEY,
                user_id VARCHAR(36) NOT NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                category VARCHAR(50) NOT NULL,
                quantity INT NOT NULL DEFAULT 0 CHECK(quantity >= 0),
                min_threshold INT NOT NULL DEFAULT 0 CHECK(min_threshold >= 0),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                INDEX idx_products_user_id (user_id),
                INDEX idx_products_category (category),
                INDEX idx_products_name (name)
            )
            "#
            .to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS inventory_exits (
                id VARCHAR(36) PRIMARY KEY,
                product_id VARCHAR(36) NOT NULL,
                user_id VARCHAR(36) NOT NULL,
                quantity INT NOT NULL CHECK(quantity > 0),
                previous_quantity INT NOT NULL,
                new_quantity INT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                INDEX idx_inventory_exits_product_id (product_id)
            )
            "#
            .to_string(),
        ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_idempotent_and_complete() {
        let statements = ddl();
        assert_eq!(statements.len(), 3);
        for statement in &statements {
            assert!(statement.contains("IF NOT EXISTS"));
        }
        assert!(statements[1].contains("ON DELETE CASCADE"));
        assert!(statements[1].contains("CHECK(quantity >= 0)"));
        assert!(statements[2].contains("CHECK(quantity > 0)"));
    }
}
