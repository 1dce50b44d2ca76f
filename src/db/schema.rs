//! Schema bootstrapper.
//!
//! Creates the three tables (plus indexes) through the driver's own DDL
//! and seeds the default administrative user. Safe to run on every
//! process start: all DDL is IF NOT EXISTS and the seed insert is
//! existence-checked.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{Database, EngineKind};
use crate::error::AppResult;
use crate::password;

pub const DEFAULT_ADMIN_USERNAME: &str = "fibiadmin";
const DEFAULT_ADMIN_PASSWORD: &str = "fibi2026";

/// Create tables, indexes and the seeded admin user.
pub async fn bootstrap(db: &Database) -> AppResult<()> {
    if db.kind() == EngineKind::Sqlite {
        db.pragma("foreign_keys = ON").await?;
    }

    for statement in db.schema_statements() {
        db.exec(&statement).await?;
    }
    info!(engine = db.kind().as_str(), "tables created/verified");

    seed_default_user(db).await
}

/// Insert the fixed admin user if and only if it does not exist yet.
async fn seed_default_user(db: &Database) -> AppResult<()> {
    let existing = db
        .prepare("SELECT id FROM users WHERE username = ?")
        .get(&[DEFAULT_ADMIN_USERNAME.into()])
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let hashed = password::hash_password(DEFAULT_ADMIN_PASSWORD)?;
    let now = Utc::now();
    db.prepare(
        "INSERT INTO users (id, username, password, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .run(&[
        Uuid::new_v4().to_string().into(),
        DEFAULT_ADMIN_USERNAME.into(),
        hashed.into(),
        now.into(),
        now.into(),
    ])
    .await?;

    info!(username = DEFAULT_ADMIN_USERNAME, "default admin user created");
    Ok(())
}
