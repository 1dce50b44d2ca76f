pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod password;
pub mod state;
pub mod validation;

// Re-export commonly used types for easier access
pub use config::AppConfig;
pub use db::{Database, DriverFactory};
pub use state::AppState;
