//! Shared setup for database-backed tests
//!
//! Connection settings come from the same variables the server reads
//! (`DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`), with local
//! defaults:
//!
//! ```text
//! DB_HOST=localhost DB_USER=regnum DB_PASSWORD=regnum DB_NAME=regnum_test
//! ```

#![allow(dead_code)]

use regnum_shared::db::migrations::run_migrations;
use regnum_shared::db::pool::{create_pool, DatabaseConfig};
use sqlx::PgPool;
use std::env;

pub fn test_database_config() -> DatabaseConfig {
    DatabaseConfig {
        host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
        user: env::var("DB_USER").unwrap_or_else(|_| "regnum".to_string()),
        password: env::var("DB_PASSWORD").unwrap_or_else(|_| "regnum".to_string()),
        database: env::var("DB_NAME").unwrap_or_else(|_| "regnum_test".to_string()),
        max_connections: 5,
        acquire_timeout_seconds: 10,
        ..Default::default()
    }
}

/// Pool against a migrated test database
pub async fn migrated_pool() -> PgPool {
    let pool = create_pool(&test_database_config())
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

/// An email address no other test run has used
pub fn unique_email(prefix: &str) -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    format!("{prefix}-{nanos}@test.example")
}
