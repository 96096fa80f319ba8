//! Delivery zone repository.
//!
//! Zone geometry lives in a `PostGIS` `geometry(MultiPolygon, 4326)` column
//! and is exchanged as `GeoJSON` text. Amounts are stored as `NUMERIC` in INR.

use dayliz_core::{Coordinate, Price, TownId, ZoneId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use super::geojson::{parse_multipolygon, to_geojson};
use crate::zones::{DeliveryZone, Town};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Zone row joined with its (optional) town.
#[derive(Debug, sqlx::FromRow)]
struct ZoneRow {
    id: i32,
    name: String,
    town_id: Option<i32>,
    boundary_geojson: String,
    delivery_fee: Decimal,
    minimum_order_amount: Decimal,
    is_active: bool,
    town_name: Option<String>,
    town_state: Option<String>,
}

impl TryFrom<ZoneRow> for (DeliveryZone, Option<Town>) {
    type Error = RepositoryError;

    fn try_from(row: ZoneRow) -> Result<Self, Self::Error> {
        let geometry = parse_multipolygon(&row.boundary_geojson).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid geometry for zone {}: {e}", row.id))
        })?;

        let town = match (row.town_id, row.town_name) {
            (Some(id), Some(name)) => Some(Town {
                id: TownId::new(id),
                name,
                state: row.town_state,
            }),
            _ => None,
        };

        let zone = DeliveryZone {
            id: ZoneId::new(row.id),
            name: row.name,
            town_id: row.town_id.map(TownId::new),
            geometry,
            delivery_fee: Price::inr(row.delivery_fee),
            minimum_order: Price::inr(row.minimum_order_amount),
            is_active: row.is_active,
        };

        Ok((zone, town))
    }
}

const ZONE_COLUMNS: &str = r"
    z.id, z.name, z.town_id,
    ST_AsGeoJSON(z.boundary) AS boundary_geojson,
    z.delivery_fee, z.minimum_order_amount, z.is_active,
    t.name AS town_name, t.state AS town_state
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for delivery zone database operations.
pub struct ZoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ZoneRepository<'a> {
    /// Create a new zone repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the active zone covering `point`.
    ///
    /// Coverage is boundary-inclusive (`ST_Covers`). When several active zones
    /// cover the point, the smallest by area wins, then the lowest id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored geometry is invalid.
    #[instrument(skip(self), fields(lat = point.latitude(), lon = point.longitude()))]
    pub async fn find_active_containing(
        &self,
        point: Coordinate,
    ) -> Result<Option<(DeliveryZone, Option<Town>)>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ZONE_COLUMNS}
            FROM geofence.delivery_zones z
            LEFT JOIN geofence.towns t ON t.id = z.town_id
            WHERE z.is_active
              AND ST_Covers(z.boundary, ST_SetSRID(ST_MakePoint($1, $2), 4326))
            ORDER BY ST_Area(z.boundary) ASC, z.id ASC
            LIMIT 1
            "
        );

        let row = sqlx::query_as::<_, ZoneRow>(&sql)
            .bind(point.longitude())
            .bind(point.latitude())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List all active zones, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored geometry is invalid.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<(DeliveryZone, Option<Town>)>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ZONE_COLUMNS}
            FROM geofence.delivery_zones z
            LEFT JOIN geofence.towns t ON t.id = z.town_id
            WHERE z.is_active
            ORDER BY z.id
            "
        );

        let rows = sqlx::query_as::<_, ZoneRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert or update towns and zones by id in a single transaction.
    ///
    /// Returns the number of zones written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    #[instrument(skip_all, fields(towns = towns.len(), zones = zones.len()))]
    pub async fn upsert_all(
        &self,
        towns: &[Town],
        zones: &[DeliveryZone],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for town in towns {
            sqlx::query(
                r"
                INSERT INTO geofence.towns (id, name, state)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, state = EXCLUDED.state
                ",
            )
            .bind(town.id)
            .bind(&town.name)
            .bind(town.state.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        for zone in zones {
            sqlx::query(
                r"
                INSERT INTO geofence.delivery_zones
                    (id, name, town_id, boundary, delivery_fee, minimum_order_amount, is_active)
                VALUES ($1, $2, $3, ST_SetSRID(ST_GeomFromGeoJSON($4), 4326), $5, $6, $7)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    town_id = EXCLUDED.town_id,
                    boundary = EXCLUDED.boundary,
                    delivery_fee = EXCLUDED.delivery_fee,
                    minimum_order_amount = EXCLUDED.minimum_order_amount,
                    is_active = EXCLUDED.is_active,
                    updated_at = NOW()
                ",
            )
            .bind(zone.id)
            .bind(&zone.name)
            .bind(zone.town_id)
            .bind(to_geojson(&zone.geometry))
            .bind(zone.delivery_fee.amount)
            .bind(zone.minimum_order.amount)
            .bind(zone.is_active)
            .execute(&mut *tx)
            .await?;
        }

        // Explicit ids bypass the identity sequences; move them past the imported rows.
        for table in ["geofence.towns", "geofence.delivery_zones"] {
            sqlx::query(&format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                 GREATEST((SELECT MAX(id) FROM {table}), 1))"
            ))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(zones.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(geojson: &str) -> ZoneRow {
        ZoneRow {
            id: 7,
            name: "Tura Main Bazaar".to_string(),
            town_id: Some(3),
            boundary_geojson: geojson.to_string(),
            delivery_fee: Decimal::new(20, 0),
            minimum_order_amount: Decimal::new(99, 0),
            is_active: true,
            town_name: Some("Tura".to_string()),
            town_state: Some("Meghalaya".to_string()),
        }
    }

    #[test]
    fn test_row_conversion() {
        let (zone, town) = <(DeliveryZone, Option<Town>)>::try_from(row(
            r#"{"type":"MultiPolygon","coordinates":[[[[90.2,25.5],[90.21,25.5],[90.21,25.51],[90.2,25.51],[90.2,25.5]]]]}"#,
        ))
        .unwrap();

        assert_eq!(zone.id, ZoneId::new(7));
        assert_eq!(zone.town_id, Some(TownId::new(3)));
        assert_eq!(zone.delivery_fee, Price::inr(Decimal::new(20, 0)));
        assert!(zone.contains(Coordinate::new(25.505, 90.205).unwrap()));

        let town = town.unwrap();
        assert_eq!(town.name, "Tura");
        assert_eq!(town.state.as_deref(), Some("Meghalaya"));
    }

    #[test]
    fn test_row_with_bad_geometry_is_corruption() {
        let result = <(DeliveryZone, Option<Town>)>::try_from(row(r#"{"type":"Point","coordinates":[0,0]}"#));
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_row_without_town() {
        let mut r = row(r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#);
        r.town_id = None;
        r.town_name = None;
        let (zone, town) = <(DeliveryZone, Option<Town>)>::try_from(r).unwrap();
        assert!(zone.town_id.is_none());
        assert!(town.is_none());
    }
}
