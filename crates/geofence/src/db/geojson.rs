//! Conversion between `PostGIS` `GeoJSON` output and core polygon types.
//!
//! Zone geometry is read with `ST_AsGeoJSON` and written with
//! `ST_GeomFromGeoJSON`, so the database never has to be decoded in its binary
//! form. `GeoJSON` positions are `[longitude, latitude]`; core pairs are
//! `[latitude, longitude]`.

use dayliz_core::{MultiPolygon, Polygon, PolygonError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting `GeoJSON` geometry.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("polygons with interior rings are not supported")]
    InteriorRings,
    #[error("polygon without an exterior ring")]
    MissingExteriorRing,
    #[error("invalid polygon: {0}")]
    Polygon(#[from] PolygonError),
}

/// The subset of `GeoJSON` geometry types zones may use.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

/// Parse a `GeoJSON` `Polygon` or `MultiPolygon` into a [`MultiPolygon`].
///
/// # Errors
///
/// Returns an error for malformed JSON, other geometry types, rings with holes,
/// or rings that are not valid polygons.
pub fn parse_multipolygon(json: &str) -> Result<MultiPolygon, GeoJsonError> {
    let polygons = match serde_json::from_str::<Geometry>(json)? {
        Geometry::Polygon { coordinates } => vec![rings_to_polygon(&coordinates)?],
        Geometry::MultiPolygon { coordinates } => coordinates
            .iter()
            .map(|rings| rings_to_polygon(rings))
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(MultiPolygon::new(polygons)?)
}

/// Render a [`MultiPolygon`] as a `GeoJSON` `MultiPolygon` with closed rings.
#[must_use]
pub fn to_geojson(geometry: &MultiPolygon) -> String {
    let coordinates = geometry
        .polygons()
        .iter()
        .map(|polygon| {
            let mut ring: Vec<[f64; 2]> = polygon
                .vertices()
                .iter()
                .map(|v| [v.longitude(), v.latitude()])
                .collect();
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
            vec![ring]
        })
        .collect();

    // Serializing plain arrays of floats cannot fail.
    serde_json::to_string(&Geometry::MultiPolygon { coordinates }).unwrap_or_default()
}

fn rings_to_polygon(rings: &[Vec<[f64; 2]>]) -> Result<Polygon, GeoJsonError> {
    let (exterior, holes) = rings.split_first().ok_or(GeoJsonError::MissingExteriorRing)?;
    if !holes.is_empty() {
        return Err(GeoJsonError::InteriorRings);
    }

    let pairs: Vec<[f64; 2]> = exterior.iter().map(|[lon, lat]| [*lat, *lon]).collect();
    Ok(Polygon::from_pairs(&pairs)?)
}
