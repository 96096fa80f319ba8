//! Delivery zone lookups.
//!
//! A delivery zone is a finer-grained area inside a served city where orders
//! can actually be fulfilled. Zones are owned by the zone store; this module
//! only reads them.
//!
//! # Resolvers
//!
//! - [`PgZoneResolver`] - `PostGIS` query against `geofence.delivery_zones`
//! - [`CachedZoneResolver`] - `moka` cache in front of another resolver
//! - [`InMemoryZoneResolver`] - fixed zone list, for offline runs and tests

pub mod cache;
pub mod memory;
pub mod postgres;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dayliz_core::{Coordinate, MultiPolygon, Price, TownId, ZoneId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::RepositoryError;

pub use cache::CachedZoneResolver;
pub use memory::InMemoryZoneResolver;
pub use postgres::PgZoneResolver;

// =============================================================================
// Domain Types
// =============================================================================

/// Administrative grouping a zone belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    pub id: TownId,
    pub name: String,
    pub state: Option<String>,
}

/// A serviceable delivery area with its pricing rules.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryZone {
    pub id: ZoneId,
    pub name: String,
    pub town_id: Option<TownId>,
    pub geometry: MultiPolygon,
    /// Flat fee charged per order delivered into this zone.
    pub delivery_fee: Price,
    /// Smallest cart subtotal accepted for checkout.
    pub minimum_order: Price,
    pub is_active: bool,
}

/// Fee and minimum-order check for a cart delivered into a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryQuote {
    pub delivery_fee: Price,
    pub minimum_order: Price,
    pub meets_minimum: bool,
    /// Amount still needed to reach the minimum; zero once it is met.
    pub shortfall: Price,
}

impl DeliveryZone {
    /// Whether `point` lies inside (or on the edge of) this zone.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.geometry.contains(point)
    }

    /// Quote delivery for a cart subtotal.
    #[must_use]
    pub fn quote(&self, subtotal: Price) -> DeliveryQuote {
        let missing = (self.minimum_order.amount - subtotal.amount).max(Decimal::ZERO);
        DeliveryQuote {
            delivery_fee: self.delivery_fee,
            minimum_order: self.minimum_order,
            meets_minimum: missing.is_zero(),
            shortfall: Price::new(missing, self.minimum_order.currency_code),
        }
    }
}

/// Outcome of a successful zone lookup.
///
/// A lookup that ran but found no active zone is still `Ok`: the point is
/// simply not serviceable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneDetection {
    pub zone: Option<DeliveryZone>,
    pub town: Option<Town>,
}

impl ZoneDetection {
    /// A lookup that matched no zone.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            zone: None,
            town: None,
        }
    }

    /// A lookup that matched `zone`.
    #[must_use]
    pub const fn matched(zone: DeliveryZone, town: Option<Town>) -> Self {
        Self {
            zone: Some(zone),
            town,
        }
    }

    /// True only when a zone matched.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.zone.is_some()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Infrastructure failures while looking up a zone.
///
/// None of these mean "no zone here"; callers must not treat them as a
/// negative coverage answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZoneLookupError {
    #[error("zone lookup timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("zone store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed zone data: {0}")]
    Malformed(String),
}

impl From<RepositoryError> for ZoneLookupError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DataCorruption(msg) => Self::Malformed(msg),
            RepositoryError::Database(e) => Self::Unavailable(e.to_string()),
            RepositoryError::NotFound => Self::Unavailable("zone not found".to_string()),
        }
    }
}

// =============================================================================
// Lookup Trait
// =============================================================================

/// Something that can answer "which active delivery zone contains this point".
///
/// Implementations return at most one zone. When several active zones cover
/// the point they pick deterministically (smallest first, then lowest id).
pub trait ZoneLookup: Send + Sync {
    /// Find the active zone containing `point`.
    fn detect_zone(
        &self,
        point: Coordinate,
    ) -> impl Future<Output = Result<ZoneDetection, ZoneLookupError>> + Send;
}

impl<T: ZoneLookup> ZoneLookup for Arc<T> {
    fn detect_zone(
        &self,
        point: Coordinate,
    ) -> impl Future<Output = Result<ZoneDetection, ZoneLookupError>> + Send {
        (**self).detect_zone(point)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use dayliz_core::Polygon;

    use super::*;

    /// Square zone covering `[lo, hi]` on both axes with the given fee and minimum.
    pub fn square_zone(id: i32, lo: f64, hi: f64, fee: Decimal, minimum: Decimal) -> DeliveryZone {
        let polygon = Polygon::from_pairs(&[[lo, lo], [lo, hi], [hi, hi], [hi, lo]]).unwrap();
        DeliveryZone {
            id: ZoneId::new(id),
            name: format!("Zone {id}"),
            town_id: None,
            geometry: MultiPolygon::from(polygon),
            delivery_fee: Price::inr(fee),
            minimum_order: Price::inr(minimum),
            is_active: true,
        }
    }

    #[test]
    fn test_quote_below_minimum() {
        let zone = square_zone(1, 0.4, 0.6, Decimal::new(20, 0), Decimal::new(99, 0));
        let quote = zone.quote(Price::inr(Decimal::new(60, 0)));

        assert!(!quote.meets_minimum);
        assert_eq!(quote.shortfall, Price::inr(Decimal::new(39, 0)));
        assert_eq!(quote.delivery_fee, Price::inr(Decimal::new(20, 0)));
    }

    #[test]
    fn test_quote_meets_minimum() {
        let zone = square_zone(1, 0.4, 0.6, Decimal::new(20, 0), Decimal::new(99, 0));

        let exact = zone.quote(Price::inr(Decimal::new(99, 0)));
        assert!(exact.meets_minimum);
        assert!(exact.shortfall.is_zero());

        let above = zone.quote(Price::inr(Decimal::new(25050, 2)));
        assert!(above.meets_minimum);
        assert!(above.shortfall.is_zero());
    }

    #[test]
    fn test_detection_success_flag() {
        assert!(!ZoneDetection::none().is_success());
        let zone = square_zone(1, 0.4, 0.6, Decimal::new(20, 0), Decimal::new(99, 0));
        assert!(ZoneDetection::matched(zone, None).is_success());
    }

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let err = ZoneLookupError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "zone lookup timeout after 250ms");
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: ZoneLookupError = RepositoryError::DataCorruption("bad ring".to_string()).into();
        assert_eq!(err, ZoneLookupError::Malformed("bad ring".to_string()));

        let err: ZoneLookupError = RepositoryError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, ZoneLookupError::Unavailable(_)));
    }
}
