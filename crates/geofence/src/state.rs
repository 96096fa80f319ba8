//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::access::AccessLevelClassifier;
use crate::cities::CityBoundaryIndex;
use crate::config::GeofenceConfig;
use crate::zones::{CachedZoneResolver, PgZoneResolver};

/// Zone resolver used by the service: Postgres behind the lookup cache.
pub type ServiceZoneResolver = CachedZoneResolver<PgZoneResolver>;

/// Classifier used by the service.
pub type ServiceClassifier = AccessLevelClassifier<ServiceZoneResolver>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GeofenceConfig,
    pool: PgPool,
    classifier: ServiceClassifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Geofence configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `cities` - Served city index, loaded once at startup
    #[must_use]
    pub fn new(config: GeofenceConfig, pool: PgPool, cities: CityBoundaryIndex) -> Self {
        let resolver = PgZoneResolver::new(pool.clone(), config.zones.query_timeout);
        let zones = CachedZoneResolver::from_config(resolver, &config.zones);
        let classifier = AccessLevelClassifier::new(Arc::new(cities), zones);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                classifier,
            }),
        }
    }

    /// Get a reference to the geofence configuration.
    #[must_use]
    pub fn config(&self) -> &GeofenceConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the access classifier.
    #[must_use]
    pub fn classifier(&self) -> &ServiceClassifier {
        &self.inner.classifier
    }

    /// Get a reference to the served city index.
    #[must_use]
    pub fn cities(&self) -> &CityBoundaryIndex {
        self.inner.classifier.cities()
    }
}
