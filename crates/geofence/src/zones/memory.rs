//! In-memory zone resolver.
//!
//! Evaluates a fixed list of zones with the same boundary-inclusive polygon
//! test used for cities. Used by the CLI for offline classification against a
//! zones file, and as the zone store in tests.
//!
//! # File format
//!
//! ```json
//! {
//!   "towns": [{ "id": 1, "name": "Tura", "state": "Meghalaya" }],
//!   "zones": [{
//!     "id": 1, "name": "Main Bazaar", "town_id": 1,
//!     "delivery_fee": "20", "minimum_order": "99", "is_active": true,
//!     "boundary": [[[25.50, 90.20], [25.50, 90.22], [25.52, 90.22], [25.52, 90.20]]]
//!   }]
//! }
//! ```
//!
//! `boundary` is a list of polygons, each a ring of `[latitude, longitude]`
//! pairs. Amounts are INR.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use dayliz_core::{Coordinate, MultiPolygon, Price, TownId, ZoneId};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::{DeliveryZone, Town, ZoneDetection, ZoneLookup, ZoneLookupError};

/// Errors loading a zones file.
#[derive(Debug, Error)]
pub enum ZoneFileError {
    #[error("failed to read zones file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid zones file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate zone id {0}")]
    DuplicateZone(ZoneId),
    #[error("zone {zone} references unknown town {town}")]
    UnknownTown { zone: ZoneId, town: TownId },
}

#[derive(Debug, Deserialize)]
struct ZoneFile {
    #[serde(default)]
    towns: Vec<Town>,
    zones: Vec<ZoneRecord>,
}

#[derive(Debug, Deserialize)]
struct ZoneRecord {
    id: ZoneId,
    name: String,
    #[serde(default)]
    town_id: Option<TownId>,
    delivery_fee: Decimal,
    minimum_order: Decimal,
    #[serde(default = "default_active")]
    is_active: bool,
    boundary: MultiPolygon,
}

const fn default_active() -> bool {
    true
}

impl From<ZoneRecord> for DeliveryZone {
    fn from(record: ZoneRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            town_id: record.town_id,
            geometry: record.boundary,
            delivery_fee: Price::inr(record.delivery_fee),
            minimum_order: Price::inr(record.minimum_order),
            is_active: record.is_active,
        }
    }
}

/// Zone resolver over a fixed zone list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryZoneResolver {
    zones: Vec<DeliveryZone>,
    towns: HashMap<TownId, Town>,
}

impl InMemoryZoneResolver {
    /// Create a resolver from zones and their towns.
    ///
    /// # Errors
    ///
    /// Returns an error if zone ids repeat or a zone references a town that
    /// is not in `towns`.
    pub fn new(zones: Vec<DeliveryZone>, towns: Vec<Town>) -> Result<Self, ZoneFileError> {
        let towns: HashMap<TownId, Town> = towns.into_iter().map(|t| (t.id, t)).collect();

        let mut seen = HashSet::new();
        for zone in &zones {
            if !seen.insert(zone.id) {
                return Err(ZoneFileError::DuplicateZone(zone.id));
            }
            if let Some(town) = zone.town_id
                && !towns.contains_key(&town)
            {
                return Err(ZoneFileError::UnknownTown {
                    zone: zone.id,
                    town,
                });
            }
        }

        Ok(Self { zones, towns })
    }

    /// Parse a zones JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ZoneFileError> {
        let file: ZoneFile = serde_json::from_str(json)?;
        Self::new(
            file.zones.into_iter().map(DeliveryZone::from).collect(),
            file.towns,
        )
    }

    /// Load a zones JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ZoneFileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// All zones, active or not.
    #[must_use]
    pub fn zones(&self) -> &[DeliveryZone] {
        &self.zones
    }

    /// All towns, ordered by id.
    #[must_use]
    pub fn towns(&self) -> Vec<Town> {
        let mut towns: Vec<Town> = self.towns.values().cloned().collect();
        towns.sort_by_key(|t| t.id);
        towns
    }

    /// The active zone containing `point`: smallest area first, then lowest id.
    #[must_use]
    pub fn find(&self, point: Coordinate) -> Option<&DeliveryZone> {
        self.zones
            .iter()
            .filter(|zone| zone.is_active && zone.contains(point))
            .min_by(|a, b| {
                a.geometry
                    .area()
                    .total_cmp(&b.geometry.area())
                    .then(a.id.cmp(&b.id))
            })
    }
}

impl ZoneLookup for InMemoryZoneResolver {
    async fn detect_zone(&self, point: Coordinate) -> Result<ZoneDetection, ZoneLookupError> {
        Ok(self.find(point).map_or_else(ZoneDetection::none, |zone| {
            let town = zone.town_id.and_then(|id| self.towns.get(&id)).cloned();
            ZoneDetection::matched(zone.clone(), town)
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::zones::tests::square_zone;

    fn point(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn fee() -> Decimal {
        Decimal::new(20, 0)
    }

    fn minimum() -> Decimal {
        Decimal::new(99, 0)
    }

    #[tokio::test]
    async fn test_point_inside_zone() {
        let resolver =
            InMemoryZoneResolver::new(vec![square_zone(1, 0.4, 0.6, fee(), minimum())], vec![])
                .unwrap();

        let detection = resolver.detect_zone(point(0.5, 0.5)).await.unwrap();
        assert!(detection.is_success());
        assert_eq!(detection.zone.unwrap().id, ZoneId::new(1));

        let miss = resolver.detect_zone(point(0.2, 0.2)).await.unwrap();
        assert!(!miss.is_success());
    }

    #[tokio::test]
    async fn test_inactive_zone_ignored() {
        let mut zone = square_zone(1, 0.4, 0.6, fee(), minimum());
        zone.is_active = false;
        let resolver = InMemoryZoneResolver::new(vec![zone], vec![]).unwrap();

        let detection = resolver.detect_zone(point(0.5, 0.5)).await.unwrap();
        assert!(!detection.is_success());
    }

    #[test]
    fn test_smallest_zone_wins() {
        let resolver = InMemoryZoneResolver::new(
            vec![
                square_zone(1, 0.0, 1.0, fee(), minimum()),
                square_zone(2, 0.4, 0.6, fee(), minimum()),
            ],
            vec![],
        )
        .unwrap();

        assert_eq!(resolver.find(point(0.5, 0.5)).unwrap().id, ZoneId::new(2));
        assert_eq!(resolver.find(point(0.1, 0.1)).unwrap().id, ZoneId::new(1));
    }

    #[test]
    fn test_equal_area_lowest_id_wins() {
        let resolver = InMemoryZoneResolver::new(
            vec![
                square_zone(9, 0.4, 0.6, fee(), minimum()),
                square_zone(3, 0.4, 0.6, fee(), minimum()),
            ],
            vec![],
        )
        .unwrap();

        assert_eq!(resolver.find(point(0.5, 0.5)).unwrap().id, ZoneId::new(3));
    }

    #[test]
    fn test_duplicate_zone_rejected() {
        let result = InMemoryZoneResolver::new(
            vec![
                square_zone(1, 0.0, 1.0, fee(), minimum()),
                square_zone(1, 0.4, 0.6, fee(), minimum()),
            ],
            vec![],
        );
        assert!(matches!(result, Err(ZoneFileError::DuplicateZone(_))));
    }

    #[tokio::test]
    async fn test_from_json_with_town() {
        let json = r#"{
            "towns": [{ "id": 1, "name": "Tura", "state": "Meghalaya" }],
            "zones": [{
                "id": 4, "name": "Main Bazaar", "town_id": 1,
                "delivery_fee": "25.50", "minimum_order": "149",
                "boundary": [[[25.50, 90.20], [25.50, 90.22], [25.52, 90.22], [25.52, 90.20]]]
            }]
        }"#;
        let resolver = InMemoryZoneResolver::from_json(json).unwrap();

        let detection = resolver.detect_zone(point(25.51, 90.21)).await.unwrap();
        let zone = detection.zone.unwrap();
        assert_eq!(zone.name, "Main Bazaar");
        assert!(zone.is_active);
        assert_eq!(zone.delivery_fee, Price::inr(Decimal::new(2550, 2)));
        assert_eq!(detection.town.unwrap().name, "Tura");
    }

    #[test]
    fn test_from_json_unknown_town() {
        let json = r#"{
            "zones": [{
                "id": 4, "name": "Main Bazaar", "town_id": 7,
                "delivery_fee": "20", "minimum_order": "99",
                "boundary": [[[0, 0], [0, 1], [1, 1], [1, 0]]]
            }]
        }"#;
        assert!(matches!(
            InMemoryZoneResolver::from_json(json),
            Err(ZoneFileError::UnknownTown { .. })
        ));
    }
}
