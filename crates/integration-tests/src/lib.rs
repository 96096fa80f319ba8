//! Integration tests for Dayliz geofencing.
//!
//! # Running Tests
//!
//! ```bash
//! # Everything that needs no database
//! cargo test -p dayliz-integration-tests
//!
//! # Zone store tests against a PostGIS database
//! GEOFENCE_TEST_DATABASE_URL=postgres://localhost/dayliz_test \
//!     cargo test -p dayliz-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `access_levels` - Classifier outcomes over fixture cities and zones
//! - `city_boundaries` - The bundled city dataset
//! - `zone_store` - `PostGIS` zone lookups and saved locations (ignored by default)
//!
//! Shared fixtures live here so each test binary builds the same geography.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use dayliz_geofence::cities::CityBoundaryIndex;
use dayliz_geofence::zones::InMemoryZoneResolver;
use dayliz_geofence::zones::memory::ZoneFileError;

/// A single city covering the unit square `(0,0)..(1,1)`.
///
/// # Errors
///
/// Never fails for the fixed document; the `Result` mirrors the loader.
pub fn unit_square_city() -> Result<Arc<CityBoundaryIndex>, dayliz_geofence::cities::CityDatasetError> {
    CityBoundaryIndex::from_json(
        r#"{
            "version": 1,
            "cities": [{
                "id": 1,
                "name": "Unit City",
                "slug": "unit-city",
                "boundary": [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
            }]
        }"#,
    )
    .map(Arc::new)
}

/// Zones JSON for one active zone over `(0.4,0.4)..(0.6,0.6)`, fee 20, minimum 99.
pub const CENTRE_ZONE_JSON: &str = r#"{
    "towns": [{ "id": 1, "name": "Centre Town", "state": "Testland" }],
    "zones": [{
        "id": 1,
        "name": "Centre",
        "town_id": 1,
        "delivery_fee": "20",
        "minimum_order": "99",
        "boundary": [[[0.4, 0.4], [0.4, 0.6], [0.6, 0.6], [0.6, 0.4]]]
    }]
}"#;

/// Resolver holding [`CENTRE_ZONE_JSON`].
///
/// # Errors
///
/// Never fails for the fixed document; the `Result` mirrors the loader.
pub fn centre_zone() -> Result<InMemoryZoneResolver, ZoneFileError> {
    InMemoryZoneResolver::from_json(CENTRE_ZONE_JSON)
}
