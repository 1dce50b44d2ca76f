//! PostgreSQL client/server engine driver.
//!
//! PostgreSQL speaks numbered placeholders (`$1`, `$2`, ...), so every
//! statement is translated from the facade's `?` convention at prepare
//! time. The translation is string-literal aware and lives entirely here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

use super::{BatchOutcome, BatchStatement, DatabaseConfig, Driver, EngineKind, Row, SqlValue};
use crate::error::{AppError, AppResult};

pub struct PostgresDriver {
    pool: PgPool,
}

impl PostgresDriver {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Rewrite `?` placeholders as `$1`, `$2`, ... in statement order.
///
/// Question marks inside single- or double-quoted runs are left alone;
/// a doubled quote inside a literal is the standard SQL escape.
pub fn translate_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    if chars.peek() == Some(&q) {
                        out.push(chars.next().unwrap());
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    out
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
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

/// Rows arrive already keyed; map PostgreSQL's column types onto the
/// facade's value enum.
fn decode_row(row: &PgRow) -> AppResult<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i).map_err(AppError::Sqlx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INT2" => SqlValue::Integer(row.try_get::<i16, _>(i)? as i64),
                "INT4" => SqlValue::Integer(row.try_get::<i32, _>(i)? as i64),
                "INT8" => SqlValue::Integer(row.try_get::<i64, _>(i)?),
                "FLOAT4" => SqlValue::Real(row.try_get::<f32, _>(i)? as f64),
                "FLOAT8" => SqlValue::Real(row.try_get::<f64, _>(i)?),
                "BOOL" => SqlValue::Integer(row.try_get::<bool, _>(i)? as i64),
                "TIMESTAMPTZ" => {
                    SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(i)?)
                }
                "TIMESTAMP" => {
                    let naive: chrono::NaiveDateTime = row.try_get(i)?;
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
impl Driver for PostgresDriver {
    fn kind(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        let sql = translate_placeholders(sql);
        let result = bind_params(sqlx::query(&sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<Row>> {
        let sql = translate_placeholders(sql);
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn all(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<Row>> {
        let sql = translate_placeholders(sql);
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn exec(&self, sql: &str) -> AppResult<()> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn pragma(&self, setting: &str) -> AppResult<()> {
        tracing::warn!(setting, "PRAGMA not supported by PostgreSQL, ignoring");
        Ok(())
    }

    async fn run_batch(&self, statements: &[BatchStatement]) -> AppResult<BatchOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut affected = Vec::with_capacity(statements.len());
        for (index, statement) in statements.iter().enumerate() {
            let sql = translate_placeholders(&statement.sql);
            let result = bind_params(sqlx::query(&sql), &statement.params)
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

fn ddl() -> Vec<String> {
    vec![
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id VARCHAR(36) PRIMARY KEY,
            username VARCHAR(255) UNIQUE NOT NULL,
            password VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
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
            quantity INTEGER NOT NULL DEFAULT 0 CHECK(quantity >= 0),
            min_threshold INTEGER NOT NULL DEFAULT 0 CHECK(min_threshold >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#
        .to_string(),
        r#"
        CREATE TABLE IF NOT EXISTS inventory_exits (
            id VARCHAR(36) PRIMARY KEY,
            product_id VARCHAR(36) NOT NULL,
            user_id VARCHAR(36) NOT NULL,
            quantity INTEGER NOT NULL CHECK(quantity > 0),
            previous_quantity INTEGER NOT NULL,
            new_quantity INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
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
