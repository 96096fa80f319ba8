//! CLI subcommands.

pub mod cities;
pub mod classify;
pub mod migrate;
pub mod zones;

use dayliz_geofence::config::{ConfigError, GeofenceConfig};
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that talk to the geofence database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load the geofence configuration and open a connection pool.
pub async fn connect() -> Result<(GeofenceConfig, PgPool), ConnectError> {
    let config = GeofenceConfig::from_env()?;

    tracing::info!("Connecting to geofence database...");
    let pool = dayliz_geofence::db::create_pool(&config.database_url).await?;

    Ok((config, pool))
}
