//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! dayliz migrate
//! ```
//!
//! # Environment Variables
//!
//! - `GEOFENCE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Geofence migrations: `crates/geofence/migrations/`. The database needs the
//! `PostGIS` extension available; the first migration enables it.

use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run geofence database migrations.
pub async fn run() -> Result<(), MigrationError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running geofence migrations...");
    sqlx::migrate!("../geofence/migrations").run(&pool).await?;

    tracing::info!("Geofence migrations complete!");
    Ok(())
}
