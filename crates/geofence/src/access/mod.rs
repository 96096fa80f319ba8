//! Access level classification.
//!
//! Combines the city index and a zone resolver into one decision:
//!
//! | City   | Zone lookup        | Result        |
//! |--------|--------------------|---------------|
//! | none   | (not called)       | `NoAccess`    |
//! | found  | active zone        | `FullAccess`  |
//! | found  | no zone            | `ViewingOnly` |
//! | found  | failed             | `Error`       |
//!
//! A failed lookup is never reported as `NoAccess`: the user is inside a served
//! city and should be offered a retry, not told the service does not exist.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dayliz_core::{AccessLevel, Coordinate, Price, ZoneId};
use futures::FutureExt;
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::cities::{CityBoundary, CityBoundaryIndex, CityInfo};
use crate::zones::{DeliveryZone, Town, ZoneLookup};

/// Message for points outside every served city.
pub const NOT_SERVED_MESSAGE: &str = "Sorry, we don't serve this area yet.";

// =============================================================================
// AccessResult
// =============================================================================

/// Outcome of classifying a location.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessResult {
    /// Inside an active delivery zone: ordering allowed.
    FullAccess {
        coordinates: Coordinate,
        zone: DeliveryZone,
        town: Option<Town>,
        city: Arc<CityBoundary>,
        detected_at: DateTime<Utc>,
    },
    /// Inside a served city but outside every active zone: browsing only.
    ViewingOnly {
        coordinates: Coordinate,
        city: Arc<CityBoundary>,
        message: String,
        detected_at: DateTime<Utc>,
    },
    /// Outside every served city.
    NoAccess {
        coordinates: Coordinate,
        message: String,
        detected_at: DateTime<Utc>,
    },
    /// The zone status could not be determined; the caller may retry.
    Error {
        coordinates: Coordinate,
        city: Option<Arc<CityBoundary>>,
        message: String,
        detected_at: DateTime<Utc>,
    },
}

impl AccessResult {
    /// Whether orders may be placed.
    #[must_use]
    pub const fn can_order(&self) -> bool {
        matches!(self, Self::FullAccess { .. })
    }

    /// Whether the catalogue may be browsed.
    #[must_use]
    pub const fn can_browse(&self) -> bool {
        matches!(self, Self::FullAccess { .. } | Self::ViewingOnly { .. })
    }

    /// Whether classification failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The three-state level, or `None` when classification failed.
    #[must_use]
    pub const fn access_level(&self) -> Option<AccessLevel> {
        match self {
            Self::FullAccess { .. } => Some(AccessLevel::Full),
            Self::ViewingOnly { .. } => Some(AccessLevel::ViewingOnly),
            Self::NoAccess { .. } => Some(AccessLevel::None),
            Self::Error { .. } => None,
        }
    }

    /// The classified point.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinate {
        match self {
            Self::FullAccess { coordinates, .. }
            | Self::ViewingOnly { coordinates, .. }
            | Self::NoAccess { coordinates, .. }
            | Self::Error { coordinates, .. } => *coordinates,
        }
    }

    /// When the classification was made.
    #[must_use]
    pub const fn detected_at(&self) -> DateTime<Utc> {
        match self {
            Self::FullAccess { detected_at, .. }
            | Self::ViewingOnly { detected_at, .. }
            | Self::NoAccess { detected_at, .. }
            | Self::Error { detected_at, .. } => *detected_at,
        }
    }

    /// The matched city, if one was determined.
    #[must_use]
    pub fn city(&self) -> Option<&CityBoundary> {
        match self {
            Self::FullAccess { city, .. } | Self::ViewingOnly { city, .. } => Some(city),
            Self::Error { city, .. } => city.as_deref(),
            Self::NoAccess { .. } => None,
        }
    }

    /// The matched zone, for full access only.
    #[must_use]
    pub const fn zone(&self) -> Option<&DeliveryZone> {
        match self {
            Self::FullAccess { zone, .. } => Some(zone),
            _ => None,
        }
    }

    /// User-facing message; full access carries none.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::FullAccess { .. } => None,
            Self::ViewingOnly { message, .. }
            | Self::NoAccess { message, .. }
            | Self::Error { message, .. } => Some(message),
        }
    }
}

// =============================================================================
// AccessSummary
// =============================================================================

/// Serializable kind of an [`AccessResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    FullAccess,
    ViewingOnly,
    NoAccess,
    Error,
}

/// Zone details exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    pub id: ZoneId,
    pub name: String,
    pub delivery_fee: Price,
    pub minimum_order: Price,
}

/// Flat, serializable view of an [`AccessResult`] for the HTTP API and CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessSummary {
    pub status: AccessStatus,
    /// `None` when classification failed.
    pub access_level: Option<AccessLevel>,
    pub can_order: bool,
    pub can_browse: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<CityInfo>,
    pub zone: Option<ZoneInfo>,
    pub town: Option<Town>,
    pub message: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl From<&AccessResult> for AccessSummary {
    fn from(result: &AccessResult) -> Self {
        let status = match result {
            AccessResult::FullAccess { .. } => AccessStatus::FullAccess,
            AccessResult::ViewingOnly { .. } => AccessStatus::ViewingOnly,
            AccessResult::NoAccess { .. } => AccessStatus::NoAccess,
            AccessResult::Error { .. } => AccessStatus::Error,
        };
        let town = match result {
            AccessResult::FullAccess { town, .. } => town.clone(),
            _ => None,
        };
        let coordinates = result.coordinates();

        Self {
            status,
            access_level: result.access_level(),
            can_order: result.can_order(),
            can_browse: result.can_browse(),
            latitude: coordinates.latitude(),
            longitude: coordinates.longitude(),
            city: result.city().map(CityInfo::from),
            zone: result.zone().map(|zone| ZoneInfo {
                id: zone.id,
                name: zone.name.clone(),
                delivery_fee: zone.delivery_fee,
                minimum_order: zone.minimum_order,
            }),
            town,
            message: result.message().map(str::to_string),
            detected_at: result.detected_at(),
        }
    }
}

// =============================================================================
// AccessLevelClassifier
// =============================================================================

/// Classifies locations against served cities and delivery zones.
///
/// The city check is local and synchronous; the zone lookup is the only I/O.
/// [`detect_access_level`](Self::detect_access_level) always returns a result,
/// even if the resolver panics.
#[derive(Debug, Clone)]
pub struct AccessLevelClassifier<Z> {
    cities: Arc<CityBoundaryIndex>,
    zones: Z,
}

impl<Z: ZoneLookup> AccessLevelClassifier<Z> {
    /// Create a classifier over a city index and a zone resolver.
    #[must_use]
    pub const fn new(cities: Arc<CityBoundaryIndex>, zones: Z) -> Self {
        Self { cities, zones }
    }

    /// The city index.
    #[must_use]
    pub fn cities(&self) -> &CityBoundaryIndex {
        &self.cities
    }

    /// The zone resolver.
    #[must_use]
    pub const fn zones(&self) -> &Z {
        &self.zones
    }

    /// Classify `point`.
    ///
    /// The city check is pure; only the zone lookup is guarded against panics,
    /// so every `Error` past the city check still names the city.
    #[instrument(skip(self), fields(lat = point.latitude(), lon = point.longitude()))]
    pub async fn detect_access_level(&self, point: Coordinate) -> AccessResult {
        let Some(city) = self.cities.detect_city_boundary(point).cloned() else {
            return AccessResult::NoAccess {
                coordinates: point,
                message: NOT_SERVED_MESSAGE.to_string(),
                detected_at: Utc::now(),
            };
        };

        let lookup = AssertUnwindSafe(self.zones.detect_zone(point)).catch_unwind();
        let detection = match lookup.await {
            Ok(Ok(detection)) => detection,
            Ok(Err(e)) => {
                warn!(city = %city.slug, error = %e, "Zone lookup failed");
                return AccessResult::Error {
                    coordinates: point,
                    city: Some(city),
                    message: e.to_string(),
                    detected_at: Utc::now(),
                };
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(city = %city.slug, error = %message, "Zone lookup panicked");
                return AccessResult::Error {
                    coordinates: point,
                    city: Some(city),
                    message: format!("access check failed: {message}"),
                    detected_at: Utc::now(),
                };
            }
        };

        match detection.zone {
            Some(zone) if zone.is_active => AccessResult::FullAccess {
                coordinates: point,
                zone,
                town: detection.town,
                city,
                detected_at: Utc::now(),
            },
            inactive => {
                if let Some(zone) = inactive {
                    warn!(zone_id = %zone.id, "Resolver returned an inactive zone; treating as no zone");
                }
                AccessResult::ViewingOnly {
                    coordinates: point,
                    message: viewing_only_message(&city),
                    city,
                    detected_at: Utc::now(),
                }
            }
        }
    }
}

fn viewing_only_message(city: &CityBoundary) -> String {
    format!(
        "We're in {} but don't deliver to your exact location yet. You can still browse.",
        city.name
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use dayliz_core::{CityId, Polygon};
    use rust_decimal::Decimal;

    use super::*;
    use crate::zones::tests::square_zone;
    use crate::zones::{InMemoryZoneResolver, ZoneDetection, ZoneLookupError};

    fn point(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn unit_city() -> Arc<CityBoundaryIndex> {
        let city = CityBoundary {
            id: CityId::new(1),
            name: "Unitville".to_string(),
            slug: "unitville".to_string(),
            state: None,
            polygon: Polygon::from_pairs(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]])
                .unwrap(),
        };
        Arc::new(CityBoundaryIndex::new(vec![city]).unwrap())
    }

    fn zone_resolver() -> InMemoryZoneResolver {
        InMemoryZoneResolver::new(
            vec![square_zone(1, 0.4, 0.6, Decimal::new(20, 0), Decimal::new(99, 0))],
            vec![],
        )
        .unwrap()
    }

    /// Answers every lookup with the same outcome.
    struct FixedResolver(Result<ZoneDetection, ZoneLookupError>);

    impl ZoneLookup for FixedResolver {
        async fn detect_zone(&self, _point: Coordinate) -> Result<ZoneDetection, ZoneLookupError> {
            self.0.clone()
        }
    }

    struct PanickingResolver;

    impl ZoneLookup for PanickingResolver {
        async fn detect_zone(&self, _point: Coordinate) -> Result<ZoneDetection, ZoneLookupError> {
            panic!("zone index corrupted")
        }
    }

    #[tokio::test]
    async fn test_full_access_inside_zone() {
        let classifier = AccessLevelClassifier::new(unit_city(), zone_resolver());
        let result = classifier.detect_access_level(point(0.5, 0.5)).await;

        assert!(result.can_order());
        assert!(result.can_browse());
        let zone = result.zone().unwrap();
        assert_eq!(zone.delivery_fee, Price::inr(Decimal::new(20, 0)));
        assert_eq!(zone.minimum_order, Price::inr(Decimal::new(99, 0)));
        assert_eq!(result.city().unwrap().slug, "unitville");
        assert!(result.message().is_none());
    }

    #[tokio::test]
    async fn test_viewing_only_outside_zone() {
        let classifier = AccessLevelClassifier::new(unit_city(), zone_resolver());
        let result = classifier.detect_access_level(point(0.2, 0.2)).await;

        assert!(matches!(result, AccessResult::ViewingOnly { .. }));
        assert!(!result.can_order());
        assert!(result.can_browse());
        assert!(result.message().unwrap().contains("Unitville"));
    }

    #[tokio::test]
    async fn test_no_access_outside_city() {
        let classifier = AccessLevelClassifier::new(unit_city(), zone_resolver());
        let result = classifier.detect_access_level(point(5.0, 5.0)).await;

        assert!(matches!(result, AccessResult::NoAccess { .. }));
        assert!(!result.can_order());
        assert!(!result.can_browse());
        assert_eq!(result.message(), Some(NOT_SERVED_MESSAGE));
    }

    #[tokio::test]
    async fn test_resolver_not_called_outside_city() {
        let classifier = AccessLevelClassifier::new(unit_city(), PanickingResolver);
        let result = classifier.detect_access_level(point(5.0, 5.0)).await;
        assert!(matches!(result, AccessResult::NoAccess { .. }));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_error_not_no_access() {
        let classifier = AccessLevelClassifier::new(
            unit_city(),
            FixedResolver(Err(ZoneLookupError::Timeout(Duration::from_millis(5000)))),
        );
        let result = classifier.detect_access_level(point(0.5, 0.5)).await;

        assert!(result.is_error());
        assert!(!result.can_order());
        assert!(!result.can_browse());
        assert!(result.message().unwrap().contains("timeout"));
        assert_eq!(result.city().unwrap().slug, "unitville");
        assert_eq!(result.access_level(), None);
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let classifier = AccessLevelClassifier::new(unit_city(), PanickingResolver);
        let result = classifier.detect_access_level(point(0.5, 0.5)).await;

        assert!(result.is_error());
        assert!(result.message().unwrap().contains("zone index corrupted"));
        assert_eq!(result.city().unwrap().slug, "unitville");
    }

    #[tokio::test]
    async fn test_inactive_zone_treated_as_no_zone() {
        let mut zone = square_zone(1, 0.4, 0.6, Decimal::new(20, 0), Decimal::new(99, 0));
        zone.is_active = false;
        let classifier = AccessLevelClassifier::new(
            unit_city(),
            FixedResolver(Ok(ZoneDetection::matched(zone, None))),
        );

        let result = classifier.detect_access_level(point(0.5, 0.5)).await;
        assert!(matches!(result, AccessResult::ViewingOnly { .. }));
    }

    #[tokio::test]
    async fn test_summary_projection() {
        let classifier = AccessLevelClassifier::new(unit_city(), zone_resolver());
        let result = classifier.detect_access_level(point(0.5, 0.5)).await;
        let summary = AccessSummary::from(&result);

        assert_eq!(summary.status, AccessStatus::FullAccess);
        assert_eq!(summary.access_level, Some(AccessLevel::Full));
        assert!(summary.can_order);
        assert_eq!(summary.zone.as_ref().unwrap().id, ZoneId::new(1));
        assert_eq!(summary.city.as_ref().unwrap().name, "Unitville");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "full_access");
        assert_eq!(json["access_level"], "full");
        assert_eq!(json["zone"]["delivery_fee"]["amount"], "20");
    }

    #[tokio::test]
    async fn test_error_summary_has_no_level() {
        let classifier = AccessLevelClassifier::new(
            unit_city(),
            FixedResolver(Err(ZoneLookupError::Unavailable("connection refused".to_string()))),
        );
        let summary = AccessSummary::from(&classifier.detect_access_level(point(0.5, 0.5)).await);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["access_level"].is_null());
        assert_eq!(json["can_browse"], false);
    }
}
