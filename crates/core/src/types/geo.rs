//! Geographic primitives: coordinates, polygons and containment tests.
//!
//! All polygons use planar geometry over (longitude, latitude) degrees. That
//! is accurate enough for city- and neighbourhood-sized shapes; rings that
//! cross the antimeridian are not supported.
//!
//! # Boundary policy
//!
//! Containment is **boundary-inclusive**: a point lying on an edge or a vertex
//! of a polygon is inside it. The edge test runs before the even-odd ray cast,
//! so the answer never depends on how the ray happens to hit a vertex.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance (in degrees) used when deciding whether a point lies on an edge.
///
/// 1e-10 degrees is roughly 0.01 mm at the equator.
const EDGE_EPSILON: f64 = 1e-10;

/// Errors that can occur when constructing a [`Coordinate`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    /// Latitude or longitude is NaN or infinite.
    #[error("coordinates must be finite numbers")]
    NotFinite,
    /// Latitude outside `[-90, 90]`.
    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),
    /// Longitude outside `[-180, 180]`.
    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),
}

/// A WGS84 latitude/longitude pair in degrees.
///
/// A `Coordinate` is always valid: both values are finite and within range.
///
/// # Examples
///
/// ```
/// use dayliz_core::Coordinate;
///
/// let tura = Coordinate::new(25.5138, 90.2036).unwrap();
/// assert!((tura.latitude() - 25.5138).abs() < f64::EPSILON);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// assert!(Coordinate::new(f64::NAN, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is not finite or is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    // Planar x/y used by the polygon math.
    const fn x(self) -> f64 {
        self.longitude
    }

    const fn y(self) -> f64 {
        self.latitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Errors that can occur when constructing a [`Polygon`] or [`MultiPolygon`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolygonError {
    /// Fewer than three distinct vertices.
    #[error("polygon needs at least 3 distinct vertices (got {count})")]
    TooFewVertices {
        /// Number of distinct vertices supplied.
        count: usize,
    },
    /// A vertex is not a valid coordinate.
    #[error("invalid vertex at index {index}: {source}")]
    InvalidVertex {
        /// Position of the vertex in the input ring.
        index: usize,
        /// Why the vertex was rejected.
        source: CoordinateError,
    },
    /// All vertices are collinear.
    #[error("polygon has zero area")]
    Degenerate,
    /// A multipolygon without any polygon.
    #[error("multipolygon must contain at least one polygon")]
    Empty,
}

/// An axis-aligned bounding box in degrees. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    fn around(vertices: &[Coordinate]) -> Self {
        vertices.iter().fold(
            Self {
                min_latitude: f64::INFINITY,
                max_latitude: f64::NEG_INFINITY,
                min_longitude: f64::INFINITY,
                max_longitude: f64::NEG_INFINITY,
            },
            |bbox, v| Self {
                min_latitude: bbox.min_latitude.min(v.latitude),
                max_latitude: bbox.max_latitude.max(v.latitude),
                min_longitude: bbox.min_longitude.min(v.longitude),
                max_longitude: bbox.max_longitude.max(v.longitude),
            },
        )
    }

    /// Returns true if the point is inside or on the box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_latitude - EDGE_EPSILON
            && point.latitude <= self.max_latitude + EDGE_EPSILON
            && point.longitude >= self.min_longitude - EDGE_EPSILON
            && point.longitude <= self.max_longitude + EDGE_EPSILON
    }

    /// Returns true if the two boxes share at least one point.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_latitude <= other.max_latitude
            && other.min_latitude <= self.max_latitude
            && self.min_longitude <= other.max_longitude
            && other.min_longitude <= self.max_longitude
    }

    fn union(&self, other: &Self) -> Self {
        Self {
            min_latitude: self.min_latitude.min(other.min_latitude),
            max_latitude: self.max_latitude.max(other.max_latitude),
            min_longitude: self.min_longitude.min(other.min_longitude),
            max_longitude: self.max_longitude.max(other.max_longitude),
        }
    }
}

/// A simple polygon: a closed ring of at least three distinct vertices.
///
/// The ring is implicitly closed; a trailing vertex equal to the first one is
/// accepted and dropped. Serialized as a list of `[latitude, longitude]` pairs.
///
/// # Examples
///
/// ```
/// use dayliz_core::{Coordinate, Polygon};
///
/// let square = Polygon::from_pairs(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]).unwrap();
/// assert!(square.contains(Coordinate::new(0.5, 0.5).unwrap()));
/// assert!(square.contains(Coordinate::new(0.0, 0.0).unwrap())); // vertex
/// assert!(!square.contains(Coordinate::new(5.0, 5.0).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct Polygon {
    vertices: Vec<Coordinate>,
    bbox: BoundingBox,
}

impl Polygon {
    /// Create a polygon from its ring of vertices.
    ///
    /// # Errors
    ///
    /// Returns an error if the ring has fewer than three distinct vertices or
    /// if all vertices are collinear.
    pub fn new(mut vertices: Vec<Coordinate>) -> Result<Self, PolygonError> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        vertices.dedup();

        if vertices.len() < 3 {
            return Err(PolygonError::TooFewVertices {
                count: vertices.len(),
            });
        }

        let bbox = BoundingBox::around(&vertices);
        let polygon = Self { vertices, bbox };

        if polygon.twice_signed_area().abs() <= EDGE_EPSILON {
            return Err(PolygonError::Degenerate);
        }

        Ok(polygon)
    }

    /// Create a polygon from `[latitude, longitude]` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a pair is not a valid coordinate or the ring is
    /// not a valid polygon.
    pub fn from_pairs(pairs: &[[f64; 2]]) -> Result<Self, PolygonError> {
        let vertices = pairs
            .iter()
            .enumerate()
            .map(|(index, [lat, lon])| {
                Coordinate::new(*lat, *lon)
                    .map_err(|source| PolygonError::InvalidVertex { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(vertices)
    }

    /// The ring's vertices, without the closing vertex.
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// The polygon's bounding box.
    #[must_use]
    pub const fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Iterate over the ring's edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        self.vertices
            .iter()
            .copied()
            .zip(self.vertices.iter().copied().cycle().skip(1))
    }

    /// Point-in-polygon test (boundary-inclusive even-odd rule).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        if !self.bbox.contains(point) {
            return false;
        }

        if self.edges().any(|(a, b)| on_segment(point, a, b)) {
            return true;
        }

        let (x, y) = (point.x(), point.y());
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y() > y) != (b.y() > y) {
                let crossing_x = (b.x() - a.x()) * (y - a.y()) / (b.y() - a.y()) + a.x();
                if x < crossing_x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Returns true if the polygons share any point (including touching edges).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        if !self.bbox.intersects(&other.bbox) {
            return false;
        }

        if self.vertices.iter().any(|v| other.contains(*v))
            || other.vertices.iter().any(|v| self.contains(*v))
        {
            return true;
        }

        self.edges().any(|(a, b)| {
            other
                .edges()
                .any(|(c, d)| segments_intersect(a, b, c, d))
        })
    }

    /// Planar area in square degrees.
    ///
    /// Only meaningful for comparing nearby polygons, e.g. picking the
    /// smaller of two overlapping zones.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.twice_signed_area().abs() / 2.0
    }

    /// Twice the signed area (shoelace formula), in square degrees.
    fn twice_signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x().mul_add(b.y(), -(b.x() * a.y())))
            .sum()
    }
}

impl TryFrom<Vec<[f64; 2]>> for Polygon {
    type Error = PolygonError;

    fn try_from(pairs: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        Self::from_pairs(&pairs)
    }
}

impl From<Polygon> for Vec<[f64; 2]> {
    fn from(polygon: Polygon) -> Self {
        polygon
            .vertices
            .into_iter()
            .map(|v| [v.latitude, v.longitude])
            .collect()
    }
}

/// A non-empty set of polygons treated as one area.
///
/// Delivery zones may consist of several disjoint pieces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Polygon>", into = "Vec<Polygon>")]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
    bbox: BoundingBox,
}

impl MultiPolygon {
    /// Create a multipolygon.
    ///
    /// # Errors
    ///
    /// Returns `PolygonError::Empty` if `polygons` is empty.
    pub fn new(polygons: Vec<Polygon>) -> Result<Self, PolygonError> {
        let mut iter = polygons.iter();
        let first = iter.next().ok_or(PolygonError::Empty)?;
        let bbox = iter.fold(first.bbox, |acc, p| acc.union(&p.bbox));
        Ok(Self { polygons, bbox })
    }

    /// The member polygons.
    #[must_use]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Bounding box over all member polygons.
    #[must_use]
    pub const fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Returns true if any member polygon contains the point.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.bbox.contains(point) && self.polygons.iter().any(|p| p.contains(point))
    }

    /// Sum of the member polygons' planar areas, in square degrees.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(polygon: Polygon) -> Self {
        let bbox = polygon.bbox;
        Self {
            polygons: vec![polygon],
            bbox,
        }
    }
}

impl TryFrom<Vec<Polygon>> for MultiPolygon {
    type Error = PolygonError;

    fn try_from(polygons: Vec<Polygon>) -> Result<Self, Self::Error> {
        Self::new(polygons)
    }
}

impl From<MultiPolygon> for Vec<Polygon> {
    fn from(multi: MultiPolygon) -> Self {
        multi.polygons
    }
}

/// Cross product of (b - a) and (p - a).
fn orientation(a: Coordinate, b: Coordinate, p: Coordinate) -> f64 {
    (b.x() - a.x()).mul_add(p.y() - a.y(), -((b.y() - a.y()) * (p.x() - a.x())))
}

fn within_span(p: Coordinate, a: Coordinate, b: Coordinate) -> bool {
    p.x() >= a.x().min(b.x()) - EDGE_EPSILON
        && p.x() <= a.x().max(b.x()) + EDGE_EPSILON
        && p.y() >= a.y().min(b.y()) - EDGE_EPSILON
        && p.y() <= a.y().max(b.y()) + EDGE_EPSILON
}

fn on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> bool {
    orientation(a, b, p).abs() <= EDGE_EPSILON && within_span(p, a, b)
}

fn segments_intersect(a: Coordinate, b: Coordinate, c: Coordinate, d: Coordinate) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > EDGE_EPSILON && o2 < -EDGE_EPSILON) || (o1 < -EDGE_EPSILON && o2 > EDGE_EPSILON))
        && ((o3 > EDGE_EPSILON && o4 < -EDGE_EPSILON) || (o3 < -EDGE_EPSILON && o4 > EDGE_EPSILON))
    {
        return true;
    }

    on_segment(c, a, b) || on_segment(d, a, b) || on_segment(a, c, d) || on_segment(b, c, d)
}
