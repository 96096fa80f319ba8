//! Caching decorator for zone resolvers.
//!
//! Caches successful lookups (match or no match) in a `moka` async cache keyed
//! by the exact coordinate. Neighbouring points never share an entry, so a
//! point just outside a zone edge cannot answer for one just inside it.
//! Failed lookups are never cached so the next request retries the store.

use std::time::Duration;

use dayliz_core::Coordinate;
use moka::future::Cache;
use tracing::{debug, instrument};

use super::{ZoneDetection, ZoneLookup, ZoneLookupError};
use crate::config::ZoneLookupConfig;

type CacheKey = (u64, u64);

/// Wraps a [`ZoneLookup`] with a TTL cache.
///
/// Built without a TTL the cache is disabled and every lookup goes to the
/// inner resolver.
#[derive(Clone)]
pub struct CachedZoneResolver<Z> {
    inner: Z,
    cache: Option<Cache<CacheKey, ZoneDetection>>,
}

impl<Z: ZoneLookup> CachedZoneResolver<Z> {
    /// Cache lookups for `ttl`, holding at most `capacity` entries.
    #[must_use]
    pub fn new(inner: Z, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            cache: Some(cache),
        }
    }

    /// Build from configuration; a missing TTL disables caching.
    #[must_use]
    pub fn from_config(inner: Z, config: &ZoneLookupConfig) -> Self {
        match config.cache_ttl {
            Some(ttl) => Self::new(inner, ttl, config.cache_capacity),
            None => Self::uncached(inner),
        }
    }

    /// Pass every lookup straight through.
    #[must_use]
    pub const fn uncached(inner: Z) -> Self {
        Self { inner, cache: None }
    }

    /// Whether lookups are being cached.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// The wrapped resolver.
    #[must_use]
    pub const fn inner(&self) -> &Z {
        &self.inner
    }

    /// Drop every cached lookup, e.g. after zones were edited.
    pub async fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }
}

impl<Z: ZoneLookup> ZoneLookup for CachedZoneResolver<Z> {
    #[instrument(skip(self), fields(lat = point.latitude(), lon = point.longitude()))]
    async fn detect_zone(&self, point: Coordinate) -> Result<ZoneDetection, ZoneLookupError> {
        let Some(cache) = &self.cache else {
            return self.inner.detect_zone(point).await;
        };

        let key = cache_key(point);
        if let Some(hit) = cache.get(&key).await {
            debug!("Zone cache hit");
            return Ok(hit);
        }

        let detection = self.inner.detect_zone(point).await?;
        cache.insert(key, detection.clone()).await;
        Ok(detection)
    }
}

const fn cache_key(point: Coordinate) -> CacheKey {
    (point.latitude().to_bits(), point.longitude().to_bits())
}
