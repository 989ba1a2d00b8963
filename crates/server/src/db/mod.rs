//! Database access for the report service.
//!
//! # Tables
//!
//! - `raw_materials` - Raw material reference data
//! - `formulas` - Product formulas and their component lists (JSONB)
//! - `lots` - Received lots of raw materials
//! - `production_runs` - Production runs and their consumption (JSONB)
//!
//! Every table carries a nullable `tenant_id` (UUID).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! lotwise migrate
//! ```

pub mod report_source;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use report_source::PgReportSource;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
