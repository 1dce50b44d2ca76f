//! Database abstraction layer.
//!
//! One statement contract (`prepare` → `run`/`get`/`all`, plus `exec` and
//! `pragma`) implemented by three engine drivers:
//!
//! ```text
//! Database facade (engine-agnostic, `?` placeholders)
//!     ├── sqlite/   embedded file engine
//!     ├── mysql/    client/server, native `?` placeholders
//!     └── postgres/ client/server, `?` translated to `$n`
//! ```
//!
//! Handlers only ever see the facade; the engine is chosen exactly once at
//! startup via [`DriverFactory::create`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

pub mod config;
pub mod mysql;
pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use config::DatabaseConfig;

/// Supported storage engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Sqlite,
    MySql,
    Postgres,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Sqlite => "sqlite",
            EngineKind::MySql => "mysql",
            EngineKind::Postgres => "postgresql",
        }
    }
}

/// A positional statement parameter.
///
/// The single value currency of the statement language; each driver binds
/// these to its engine's native types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

/// One result row: column name → value.
///
/// Drivers that receive columns and values as parallel sequences (SQLite)
/// pair them positionally when materializing a row.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Required text column.
    pub fn text(&self, column: &str) -> AppResult<String> {
        match self.values.get(column) {
            Some(SqlValue::Text(s)) => Ok(s.clone()),
            Some(SqlValue::Timestamp(ts)) => Ok(ts.to_rfc3339()),
            Some(SqlValue::Integer(n)) => Ok(n.to_string()),
            Some(SqlValue::Real(r)) => Ok(r.to_string()),
            Some(SqlValue::Null) | None => Err(AppError::Database(format!(
                "missing text column '{}'",
                column
            ))),
        }
    }

    /// Optional text column; NULL and absence map to None.
    pub fn opt_text(&self, column: &str) -> Option<String> {
        match self.values.get(column) {
            Some(SqlValue::Text(s)) => Some(s.clone()),
            Some(SqlValue::Timestamp(ts)) => Some(ts.to_rfc3339()),
            _ => None,
        }
    }

    /// Required integer column.
    pub fn integer(&self, column: &str) -> AppResult<i64> {
        match self.values.get(column) {
            Some(SqlValue::Integer(n)) => Ok(*n),
            Some(SqlValue::Real(r)) => Ok(*r as i64),
            Some(SqlValue::Text(s)) => s.parse::<i64>().map_err(|_| {
                AppError::Database(format!("column '{}' is not an integer", column))
            }),
            _ => Err(AppError::Database(format!(
                "missing integer column '{}'",
                column
            ))),
        }
    }

    /// Required timestamp column. Engines that hand timestamps back as
    /// text (SQLite) are parsed here.
    pub fn timestamp(&self, column: &str) -> AppResult<DateTime<Utc>> {
        match self.values.get(column) {
            Some(SqlValue::Timestamp(ts)) => Ok(*ts),
            Some(SqlValue::Text(s)) => parse_timestamp(s).ok_or_else(|| {
                AppError::Database(format!("column '{}' is not a timestamp: {}", column, s))
            }),
            _ => Err(AppError::Database(format!(
                "missing timestamp column '{}'",
                column
            ))),
        }
    }
}

/// Parse the timestamp formats the three engines hand back as text.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

/// One statement inside an atomic batch.
#[derive(Debug, Clone)]
pub struct BatchStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// When true, affecting zero rows rolls back the whole batch.
    pub guard: bool,
}

impl BatchStatement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            guard: false,
        }
    }

    pub fn guarded(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            guard: true,
        }
    }
}

/// Outcome of an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every statement ran; rows-affected per statement, in order.
    Committed(Vec<u64>),
    /// A guarded statement affected zero rows; nothing was written.
    RolledBack { failed_index: usize },
}

/// One concrete storage-engine implementation of the statement contract.
///
/// Statement text uses `?` positional placeholders regardless of engine;
/// each driver translates to its native convention before execution.
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Execute for side effects; returns rows affected.
    async fn run(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64>;

    /// Execute and return the first row, or None for zero rows.
    async fn get(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<Row>>;

    /// Execute and return every row in engine-returned order.
    async fn all(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<Row>>;

    /// Execute raw SQL without parameters (DDL and the like).
    async fn exec(&self, sql: &str) -> AppResult<()>;

    /// Apply an engine pragma. Engines without pragmas ignore the call.
    async fn pragma(&self, setting: &str) -> AppResult<()>;

    /// Run a batch of statements as one atomic unit on a single
    /// connection: all writes commit or none do. Guarded statements that
    /// affect zero rows abort and roll back the batch.
    async fn run_batch(&self, statements: &[BatchStatement]) -> AppResult<BatchOutcome>;

    async fn health_check(&self) -> AppResult<()>;

    /// Idempotent DDL for this engine's schema, in execution order.
    fn schema_statements(&self) -> Vec<String>;
}

/// A prepared, parameterized query.
pub struct Statement {
    driver: Arc<dyn Driver>,
    sql: String,
}

impl Statement {
    pub async fn run(&self, params: &[SqlValue]) -> AppResult<u64> {
        self.driver.run(&self.sql, params).await
    }

    pub async fn get(&self, params: &[SqlValue]) -> AppResult<Option<Row>> {
        self.driver.get(&self.sql, params).await
    }

    pub async fn all(&self, params: &[SqlValue]) -> AppResult<Vec<Row>> {
        self.driver.all(&self.sql, params).await
    }
}

/// Engine-agnostic handle shared by every request handler.
///
/// Constructed once at startup by [`DriverFactory::create`] and injected
/// through application state; there is no process-wide mutable slot and
/// therefore no init-order hazard.
#[derive(Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
}

impl Database {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    pub fn kind(&self) -> EngineKind {
        self.driver.kind()
    }

    pub fn prepare(&self, sql: &str) -> Statement {
        Statement {
            driver: self.driver.clone(),
            sql: sql.to_string(),
        }
    }

    pub async fn exec(&self, sql: &str) -> AppResult<()> {
        self.driver.exec(sql).await
    }

    pub async fn pragma(&self, setting: &str) -> AppResult<()> {
        self.driver.pragma(setting).await
    }

    pub async fn transaction(&self, statements: &[BatchStatement]) -> AppResult<BatchOutcome> {
        self.driver.run_batch(statements).await
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.driver.health_check().await
    }

    pub fn schema_statements(&self) -> Vec<String> {
        self.driver.schema_statements()
    }
}

/// Factory for creating the engine driver selected by configuration.
pub struct DriverFactory;

impl DriverFactory {
    /// Connect the configured engine and wrap it in the facade.
    ///
    /// A failed connection is fatal to startup; there is no degraded mode.
    pub async fn create(config: &DatabaseConfig) -> AppResult<Database> {
        let driver: Arc<dyn Driver> = match config.engine {
            EngineKind::Sqlite => Arc::new(sqlite::SqliteDriver::connect(config).await?),
            EngineKind::MySql => Arc::new(mysql::MySqlDriver::connect(config).await?),
            EngineKind::Postgres => Arc::new(postgres::PostgresDriver::connect(config).await?),
        };
        Ok(Database::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_value_conversions() {
        assert_eq!(SqlValue::from(3i64), SqlValue::Integer(3));
        assert_eq!(SqlValue::from("x"), SqlValue::Text("x".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(2i64)), SqlValue::Integer(2));
    }

    #[test]
    fn row_typed_accessors() {
        let mut row = Row::new();
        row.insert("name", SqlValue::Text("Perfume X".to_string()));
        row.insert("quantity", SqlValue::Integer(10));
        row.insert("description", SqlValue::Null);

        assert_eq!(row.text("name").unwrap(), "Perfume X");
        assert_eq!(row.integer("quantity").unwrap(), 10);
        assert_eq!(row.opt_text("description"), None);
        assert!(row.text("missing").is_err());
    }

    #[test]
    fn row_integer_accepts_text_digits() {
        // MySQL COUNT(*) can surface as DECIMAL-ish text depending on mode.
        let mut row = Row::new();
        row.insert("count", SqlValue::Text("42".to_string()));
        assert_eq!(row.integer("count").unwrap(), 42);
    }

    #[test]
    fn timestamp_parsing_covers_engine_formats() {
        assert!(parse_timestamp("2026-08-29T10:00:00+00:00").is_some());
        assert!(parse_timestamp("2026-08-29 10:00:00").is_some());
        assert!(parse_timestamp("2026-08-29 10:00:00.123").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn engine_kind_names() {
        assert_eq!(EngineKind::Sqlite.as_str(), "sqlite");
        assert_eq!(EngineKind::Postgres.as_str(), "postgresql");
    }
}
