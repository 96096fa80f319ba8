//! Zone lookups and saved locations against a `PostGIS` database.
//!
//! These tests require:
//! - A running `PostgreSQL` with the `PostGIS` extension available
//! - `GEOFENCE_TEST_DATABASE_URL` pointing at a disposable database
//!
//! Migrations are applied on connect. Fixture rows use ids from 9000 up so
//! they do not collide with imported zones.
//!
//! Run with: `cargo test -p dayliz-integration-tests -- --ignored`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use dayliz_core::{Coordinate, LocationType, UserId, ZoneId};
use dayliz_geofence::access::{AccessLevelClassifier, AccessResult};
use dayliz_geofence::cities::CityBoundaryIndex;
use dayliz_geofence::db::locations::NewUserLocation;
use dayliz_geofence::db::{UserLocationRepository, ZoneRepository};
use dayliz_geofence::zones::{InMemoryZoneResolver, PgZoneResolver, ZoneLookup};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

/// Tura town centre.
const TURA: (f64, f64) = (25.5138, 90.2036);

const FIXTURE_ZONES: &str = r#"{
    "towns": [{ "id": 9000, "name": "Tura", "state": "Meghalaya" }],
    "zones": [
        {
            "id": 9001, "name": "Tura Wide", "town_id": 9000,
            "delivery_fee": "30", "minimum_order": "149",
            "boundary": [[[25.49, 90.18], [25.49, 90.23], [25.54, 90.23], [25.54, 90.18]]]
        },
        {
            "id": 9002, "name": "Tura Main Bazaar", "town_id": 9000,
            "delivery_fee": "20", "minimum_order": "99",
            "boundary": [[[25.505, 90.195], [25.505, 90.21], [25.52, 90.21], [25.52, 90.195]]]
        },
        {
            "id": 9003, "name": "Tura Closed", "town_id": 9000,
            "delivery_fee": "0", "minimum_order": "0", "is_active": false,
            "boundary": [[[25.512, 90.202], [25.512, 90.205], [25.515, 90.205], [25.515, 90.202]]]
        }
    ]
}"#;

fn database_url() -> SecretString {
    std::env::var("GEOFENCE_TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/dayliz_test".to_string())
        .into()
}

async fn seeded_pool() -> PgPool {
    let pool = dayliz_geofence::db::create_pool(&database_url())
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../geofence/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let fixtures = InMemoryZoneResolver::from_json(FIXTURE_ZONES).unwrap();
    ZoneRepository::new(&pool)
        .upsert_all(&fixtures.towns(), fixtures.zones())
        .await
        .expect("Failed to seed zones");
    pool
}

fn point((lat, lon): (f64, f64)) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

#[tokio::test]
#[ignore = "Requires a PostGIS database"]
async fn test_smallest_active_zone_wins() {
    let pool = seeded_pool().await;
    let resolver = PgZoneResolver::new(pool, Duration::from_secs(5));

    // Inside all three fixtures; the closed one is skipped
    let detection = resolver.detect_zone(point(TURA)).await.unwrap();

    let zone = detection.zone.unwrap();
    assert_eq!(zone.id, ZoneId::new(9002));
    assert_eq!(detection.town.unwrap().name, "Tura");
}

#[tokio::test]
#[ignore = "Requires a PostGIS database"]
async fn test_database_agrees_with_in_memory_resolver() {
    let pool = seeded_pool().await;
    let db = PgZoneResolver::new(pool, Duration::from_secs(5));
    let memory = InMemoryZoneResolver::from_json(FIXTURE_ZONES).unwrap();

    for at in [TURA, (25.53, 90.22), (25.51, 90.2), (25.48, 90.2)] {
        let from_db = db.detect_zone(point(at)).await.unwrap();
        let from_memory = memory.detect_zone(point(at)).await.unwrap();
        assert_eq!(
            from_db.zone.map(|z| z.id),
            from_memory.zone.map(|z| z.id),
            "zone mismatch at {at:?}"
        );
    }
}

#[tokio::test]
#[ignore = "Requires a PostGIS database"]
async fn test_full_access_location_round_trip() {
    let pool = seeded_pool().await;
    let classifier = AccessLevelClassifier::new(
        Arc::new(CityBoundaryIndex::bundled().unwrap()),
        PgZoneResolver::new(pool.clone(), Duration::from_secs(5)),
    );
    let user = UserId::new(Uuid::new_v4());

    let access = classifier.detect_access_level(point(TURA)).await;
    assert!(matches!(access, AccessResult::FullAccess { .. }));

    let repo = UserLocationRepository::new(&pool);
    let saved = repo
        .save(
            &NewUserLocation::from_access(user, &access)
                .with_address(Some("Main Bazaar, Tura".to_string()))
                .with_type(LocationType::Home)
                .primary(true),
        )
        .await
        .unwrap();

    assert_eq!(saved.zone_id, Some(ZoneId::new(9002)));
    assert!(saved.town_id.is_some());
    assert_eq!(saved.location_type, LocationType::Home);
    assert_eq!(repo.primary_for_user(user).await.unwrap().unwrap().id, saved.id);
}

#[tokio::test]
#[ignore = "Requires a PostGIS database"]
async fn test_new_primary_demotes_old_one() {
    let pool = seeded_pool().await;
    let repo = UserLocationRepository::new(&pool);
    let user = UserId::new(Uuid::new_v4());

    let home = NewUserLocation {
        user_id: user,
        coordinate: point(TURA),
        address_text: None,
        zone_id: None,
        town_id: None,
        location_type: LocationType::Home,
        is_primary: true,
    };
    let first = repo.save(&home).await.unwrap();
    let second = repo
        .save(&NewUserLocation {
            coordinate: point((25.53, 90.22)),
            location_type: LocationType::Work,
            ..home.clone()
        })
        .await
        .unwrap();

    let locations = repo.list_for_user(user).await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations.first().unwrap().id, second.id);
    assert!(locations.first().unwrap().is_primary);
    assert!(locations.iter().any(|l| l.id == first.id && !l.is_primary));
}

#[tokio::test]
#[ignore = "Requires a PostGIS database"]
async fn test_concurrent_primary_saves_leave_one_primary() {
    let pool = seeded_pool().await;
    let repo = UserLocationRepository::new(&pool);
    let user = UserId::new(Uuid::new_v4());

    let home = NewUserLocation {
        user_id: user,
        coordinate: point(TURA),
        address_text: None,
        zone_id: None,
        town_id: None,
        location_type: LocationType::Home,
        is_primary: true,
    };
    let work = NewUserLocation {
        coordinate: point((25.53, 90.22)),
        location_type: LocationType::Work,
        ..home.clone()
    };

    let (first, second) = tokio::join!(repo.save(&home), repo.save(&work));
    first.unwrap();
    second.unwrap();

    let locations = repo.list_for_user(user).await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations.iter().filter(|l| l.is_primary).count(), 1);
}
