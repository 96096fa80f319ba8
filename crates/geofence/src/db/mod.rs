//! Database operations for the geofence `PostgreSQL` schema.
//!
//! # Schema: `geofence` (requires `PostGIS`)
//!
//! ## Tables
//!
//! - `towns` - Administrative groupings used to label zones
//! - `delivery_zones` - Zone geometry (`MultiPolygon`, SRID 4326), fee, minimum order, active flag
//! - `user_locations` - Saved user coordinates with their resolved zone/town
//!
//! # Migrations
//!
//! Migrations are stored in `crates/geofence/migrations/` and run via:
//! ```bash
//! cargo run -p dayliz-cli -- migrate
//! ```

pub mod geojson;
pub mod locations;
pub mod zones;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use locations::UserLocationRepository;
pub use zones::ZoneRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

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
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
