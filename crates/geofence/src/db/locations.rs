//! User location repository.
//!
//! Stores the coordinates a user picked or the device reported, together with
//! the zone and town resolved for them at save time. A user has at most one
//! primary location; saving a new primary demotes the old one in the same
//! transaction.

use chrono::{DateTime, Utc};
use dayliz_core::{Coordinate, LocationType, TownId, UserId, UserLocationId, ZoneId};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::RepositoryError;
use crate::access::AccessResult;

// =============================================================================
// Domain Types
// =============================================================================

/// A stored user location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserLocation {
    pub id: UserLocationId,
    pub user_id: UserId,
    pub coordinate: Coordinate,
    pub address_text: Option<String>,
    pub zone_id: Option<ZoneId>,
    pub town_id: Option<TownId>,
    pub location_type: LocationType,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A location to be saved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUserLocation {
    pub user_id: UserId,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub address_text: Option<String>,
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
    #[serde(default)]
    pub town_id: Option<TownId>,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub is_primary: bool,
}

impl NewUserLocation {
    /// Build a location from a classification result.
    ///
    /// Zone and town ids are only filled in for full access; every other
    /// outcome is saved without them.
    #[must_use]
    pub fn from_access(user_id: UserId, access: &AccessResult) -> Self {
        let (zone_id, town_id) = match access {
            AccessResult::FullAccess { zone, town, .. } => {
                (Some(zone.id), town.as_ref().map(|t| t.id).or(zone.town_id))
            }
            _ => (None, None),
        };

        Self {
            user_id,
            coordinate: access.coordinates(),
            address_text: None,
            zone_id,
            town_id,
            location_type: LocationType::default(),
            is_primary: false,
        }
    }

    /// Set the free-form address.
    #[must_use]
    pub fn with_address(mut self, address_text: Option<String>) -> Self {
        self.address_text = address_text;
        self
    }

    /// Set the location kind.
    #[must_use]
    pub const fn with_type(mut self, location_type: LocationType) -> Self {
        self.location_type = location_type;
        self
    }

    /// Mark whether this becomes the user's primary location.
    #[must_use]
    pub const fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserLocationRow {
    id: i32,
    user_id: Uuid,
    latitude: f64,
    longitude: f64,
    address_text: Option<String>,
    zone_id: Option<i32>,
    town_id: Option<i32>,
    location_type: LocationType,
    is_primary: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserLocationRow> for UserLocation {
    type Error = RepositoryError;

    fn try_from(row: UserLocationRow) -> Result<Self, Self::Error> {
        let coordinate = Coordinate::new(row.latitude, row.longitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coordinate for location {}: {e}", row.id))
        })?;

        Ok(Self {
            id: UserLocationId::new(row.id),
            user_id: UserId::new(row.user_id),
            coordinate,
            address_text: row.address_text,
            zone_id: row.zone_id.map(ZoneId::new),
            town_id: row.town_id.map(TownId::new),
            location_type: row.location_type,
            is_primary: row.is_primary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LOCATION_COLUMNS: &str = r"
    id, user_id, latitude, longitude, address_text, zone_id, town_id,
    location_type, is_primary, created_at, updated_at
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for saved user locations.
pub struct UserLocationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserLocationRepository<'a> {
    /// Create a new user location repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save a location.
    ///
    /// If the new location is primary, any existing primary location of the
    /// same user is demoted first, within one transaction. Primary saves for
    /// the same user are serialized with a transaction-scoped advisory lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    #[instrument(skip(self, location), fields(user_id = %location.user_id, primary = location.is_primary))]
    pub async fn save(&self, location: &NewUserLocation) -> Result<UserLocation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if location.is_primary {
            // Concurrent primary saves for one user queue here until commit
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
                .bind(location.user_id.as_uuid())
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r"
                UPDATE geofence.user_locations
                SET is_primary = FALSE, updated_at = NOW()
                WHERE user_id = $1 AND is_primary
                ",
            )
            .bind(location.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            r"
            INSERT INTO geofence.user_locations
                (user_id, latitude, longitude, address_text, zone_id, town_id, location_type, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LOCATION_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, UserLocationRow>(&sql)
            .bind(location.user_id.as_uuid())
            .bind(location.coordinate.latitude())
            .bind(location.coordinate.longitude())
            .bind(location.address_text.as_deref())
            .bind(location.zone_id)
            .bind(location.town_id)
            .bind(location.location_type)
            .bind(location.is_primary)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// List a user's locations, primary first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<UserLocation>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {LOCATION_COLUMNS}
            FROM geofence.user_locations
            WHERE user_id = $1
            ORDER BY is_primary DESC, created_at DESC, id DESC
            "
        );

        let rows = sqlx::query_as::<_, UserLocationRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a user's primary location, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn primary_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserLocation>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {LOCATION_COLUMNS}
            FROM geofence.user_locations
            WHERE user_id = $1 AND is_primary
            "
        );

        let row = sqlx::query_as::<_, UserLocationRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_out_of_range_latitude_is_corruption() {
        let row = UserLocationRow {
            id: 1,
            user_id: Uuid::nil(),
            latitude: 123.0,
            longitude: 90.0,
            address_text: None,
            zone_id: None,
            town_id: None,
            location_type: LocationType::Home,
            is_primary: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let result = UserLocation::try_from(row);
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_new_location_deserialize_defaults() {
        let json = r#"{"user_id":"00000000-0000-0000-0000-000000000000","coordinate":{"latitude":25.5,"longitude":90.2}}"#;
        let location: NewUserLocation = serde_json::from_str(json).unwrap();

        assert_eq!(location.location_type, LocationType::Other);
        assert!(!location.is_primary);
        assert!(location.zone_id.is_none());
    }

    #[test]
    fn test_new_location_rejects_invalid_coordinate() {
        let json = r#"{"user_id":"00000000-0000-0000-0000-000000000000","coordinate":{"latitude":95.0,"longitude":90.2}}"#;
        assert!(serde_json::from_str::<NewUserLocation>(json).is_err());
    }
}
