//! Delivery zone management commands.
//!
//! # Usage
//!
//! ```bash
//! # Active zones in the database
//! dayliz zones list
//!
//! # Insert or update towns and zones from a zones file
//! dayliz zones import zones.json
//! ```
//!
//! # Zones File
//!
//! ```json
//! {
//!   "towns": [{ "id": 1, "name": "Tura", "state": "Meghalaya" }],
//!   "zones": [{
//!     "id": 1, "name": "Tura Main Bazaar", "town_id": 1,
//!     "delivery_fee": "20", "minimum_order": "99",
//!     "boundary": [[[25.50, 90.19], [25.50, 90.22], [25.53, 90.22], [25.53, 90.19]]]
//!   }]
//! }
//! ```
//!
//! Boundary rings are `[latitude, longitude]` pairs; a zone may have several rings.
//! Importing is idempotent: existing rows with the same id are updated.

use std::path::Path;

use dayliz_geofence::db::{RepositoryError, ZoneRepository};
use dayliz_geofence::zones::InMemoryZoneResolver;
use dayliz_geofence::zones::memory::ZoneFileError;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from the zone commands.
#[derive(Debug, Error)]
pub enum ZonesError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Zones file error: {0}")]
    File(#[from] ZoneFileError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print active zones.
pub async fn list() -> Result<(), ZonesError> {
    let (_, pool) = connect().await?;
    let zones = ZoneRepository::new(&pool).list_active().await?;

    #[allow(clippy::print_stdout)]
    {
        for (zone, town) in &zones {
            println!(
                "{:>4}  {:<24} {:<12} fee {:<10} min {}",
                zone.id.to_string(),
                zone.name,
                town.as_ref().map_or("-", |t| t.name.as_str()),
                zone.delivery_fee.to_string(),
                zone.minimum_order,
            );
        }
        println!("{} active zone(s)", zones.len());
    }
    Ok(())
}

/// Validate a zones file and write it to the database.
pub async fn import(path: &Path) -> Result<(), ZonesError> {
    // Parsing validates ids, town references and ring shapes before any write
    let file = InMemoryZoneResolver::from_path(path)?;
    let towns = file.towns();
    tracing::info!(
        path = %path.display(),
        towns = towns.len(),
        zones = file.zones().len(),
        "Zones file parsed"
    );

    let (_, pool) = connect().await?;
    let written = ZoneRepository::new(&pool)
        .upsert_all(&towns, file.zones())
        .await?;

    tracing::info!(zones = written, "Zones imported");
    Ok(())
}
