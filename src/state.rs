use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::db::Database;

/// Shared application state: the backend handle wired at startup plus
/// configuration. Cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>) -> Self {
        let jwt = JwtKeys::from_config(&config.auth);
        Self { db, config, jwt }
    }
}
