//! `PostGIS`-backed zone resolver.

use std::time::Duration;

use dayliz_core::Coordinate;
use sqlx::PgPool;
use tracing::instrument;

use super::{ZoneDetection, ZoneLookup, ZoneLookupError};
use crate::db::ZoneRepository;

/// Resolves zones with a spatial query against `geofence.delivery_zones`.
///
/// Every query is bounded by `timeout`; a query that takes longer fails with
/// [`ZoneLookupError::Timeout`] instead of stalling the caller.
#[derive(Debug, Clone)]
pub struct PgZoneResolver {
    pool: PgPool,
    timeout: Duration,
}

impl PgZoneResolver {
    /// Create a resolver over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

impl ZoneLookup for PgZoneResolver {
    #[instrument(skip(self), fields(lat = point.latitude(), lon = point.longitude()))]
    async fn detect_zone(&self, point: Coordinate) -> Result<ZoneDetection, ZoneLookupError> {
        let repo = ZoneRepository::new(&self.pool);
        let lookup = repo.find_active_containing(point);

        let found = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| ZoneLookupError::Timeout(self.timeout))??;

        Ok(found.map_or_else(ZoneDetection::none, |(zone, town)| {
            tracing::debug!(zone_id = %zone.id, zone = %zone.name, "Zone matched");
            ZoneDetection::matched(zone, town)
        }))
    }
}
