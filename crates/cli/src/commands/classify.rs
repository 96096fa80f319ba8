//! Offline and online access classification.
//!
//! # Usage
//!
//! ```bash
//! # Against the zone store in the geofence database
//! dayliz classify --lat 25.5138 --lon 90.2036 --subtotal 150
//!
//! # Against a zones file, no database needed
//! dayliz classify --lat 25.5138 --lon 90.2036 --zones zones.json
//! ```
//!
//! The result is printed to stdout as the same JSON the `/api/access`
//! endpoint returns. A failed zone lookup still prints its result, then
//! exits non-zero.

use std::path::PathBuf;
use std::sync::Arc;

use dayliz_core::{Coordinate, CoordinateError, Price};
use dayliz_geofence::access::{AccessLevelClassifier, AccessResult, AccessSummary};
use dayliz_geofence::cities::{CityBoundaryIndex, CityDatasetError};
use dayliz_geofence::routes::access::AccessResponse;
use dayliz_geofence::zones::memory::ZoneFileError;
use dayliz_geofence::zones::{InMemoryZoneResolver, PgZoneResolver, ZoneLookup};
use rust_decimal::Decimal;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error("City dataset error: {0}")]
    Cities(#[from] CityDatasetError),

    #[error("Zones file error: {0}")]
    Zones(#[from] ZoneFileError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Access could not be determined: {0}")]
    Undetermined(String),
}

/// Inputs besides the coordinate.
#[derive(Debug, Default)]
pub struct ClassifyOptions {
    /// Classify against this zones file instead of the database.
    pub zones_file: Option<PathBuf>,
    /// City dataset override.
    pub cities_file: Option<PathBuf>,
    /// Cart subtotal in INR.
    pub subtotal: Option<Decimal>,
}

/// Classify one coordinate and print the result.
pub async fn run(lat: f64, lon: f64, options: &ClassifyOptions) -> Result<(), ClassifyError> {
    let point = Coordinate::new(lat, lon)?;
    let cities = Arc::new(CityBoundaryIndex::load(options.cities_file.as_deref())?);

    let result = if let Some(path) = &options.zones_file {
        let zones = InMemoryZoneResolver::from_path(path)?;
        tracing::info!(zones = zones.zones().len(), "Loaded zones file");
        classify(cities, zones, point).await
    } else {
        let (config, pool) = connect().await?;
        let zones = PgZoneResolver::new(pool, config.zones.query_timeout);
        classify(cities, zones, point).await
    };

    let quote = options
        .subtotal
        .zip(result.zone())
        .map(|(subtotal, zone)| zone.quote(Price::inr(subtotal)));

    let response = AccessResponse {
        summary: AccessSummary::from(&result),
        quote,
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    match result {
        AccessResult::Error { message, .. } => Err(ClassifyError::Undetermined(message)),
        _ => Ok(()),
    }
}

async fn classify<Z: ZoneLookup>(
    cities: Arc<CityBoundaryIndex>,
    zones: Z,
    point: Coordinate,
) -> AccessResult {
    AccessLevelClassifier::new(cities, zones)
        .detect_access_level(point)
        .await
}
