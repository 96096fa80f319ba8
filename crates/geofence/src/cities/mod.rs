//! Served city boundaries.
//!
//! The city index is the first, local tier of access control: a point outside
//! every served city gets no access without touching the zone store. The
//! dataset is small (one polygon per city), loaded once at startup and never
//! mutated.
//!
//! # Dataset format
//!
//! ```json
//! {
//!   "version": 1,
//!   "cities": [
//!     { "id": 1, "name": "Tura", "slug": "tura", "state": "Meghalaya",
//!       "boundary": [[25.55, 90.15], [25.55, 90.26], [25.47, 90.26], [25.47, 90.15]] }
//!   ]
//! }
//! ```
//!
//! Boundaries are rings of `[latitude, longitude]` pairs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use dayliz_core::{CityId, Coordinate, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Dataset format version understood by this build.
pub const DATASET_VERSION: u32 = 1;

const BUNDLED_DATASET: &str = include_str!("../../data/city_boundaries.json");

/// Errors loading a city boundary dataset.
#[derive(Debug, Error)]
pub enum CityDatasetError {
    #[error("failed to read city dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid city dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported city dataset version {0} (expected {DATASET_VERSION})")]
    UnsupportedVersion(u32),
    #[error("duplicate city id {0}")]
    DuplicateId(CityId),
    #[error("duplicate city slug '{0}'")]
    DuplicateSlug(String),
}

/// A served city and its outline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CityBoundary {
    pub id: CityId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "boundary")]
    pub polygon: Polygon,
}

impl CityBoundary {
    /// Whether `point` lies inside or on the city's outline.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        self.polygon.contains(point)
    }
}

/// Public description of a city, without its outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityInfo {
    pub id: CityId,
    pub name: String,
    pub slug: String,
    pub state: Option<String>,
}

impl From<&CityBoundary> for CityInfo {
    fn from(city: &CityBoundary) -> Self {
        Self {
            id: city.id,
            name: city.name.clone(),
            slug: city.slug.clone(),
            state: city.state.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CityDataset {
    version: u32,
    cities: Vec<CityBoundary>,
}

/// Immutable, ordered set of served cities.
///
/// Lookups test cities in dataset order and return the first match, so when
/// outlines overlap the earlier city wins.
#[derive(Debug, Clone, Default)]
pub struct CityBoundaryIndex {
    cities: Vec<Arc<CityBoundary>>,
}

impl CityBoundaryIndex {
    /// Build an index from cities in priority order.
    ///
    /// Overlapping outlines are allowed but logged.
    ///
    /// # Errors
    ///
    /// Returns an error if two cities share an id or a slug.
    pub fn new(cities: Vec<CityBoundary>) -> Result<Self, CityDatasetError> {
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        for city in &cities {
            if !ids.insert(city.id) {
                return Err(CityDatasetError::DuplicateId(city.id));
            }
            if !slugs.insert(city.slug.as_str()) {
                return Err(CityDatasetError::DuplicateSlug(city.slug.clone()));
            }
        }

        let index = Self {
            cities: cities.into_iter().map(Arc::new).collect(),
        };

        if index.cities.is_empty() {
            warn!("City dataset is empty; every location will be outside the service area");
        }
        for (first, second) in index.overlapping_pairs() {
            warn!(
                first = %first.slug,
                second = %second.slug,
                "City boundaries overlap; {} takes precedence",
                first.name
            );
        }

        Ok(index)
    }

    /// Load the dataset compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled dataset is invalid.
    pub fn bundled() -> Result<Self, CityDatasetError> {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Parse a dataset document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, has an unknown version,
    /// or repeats an id or slug.
    pub fn from_json(json: &str) -> Result<Self, CityDatasetError> {
        let dataset: CityDataset = serde_json::from_str(json)?;
        if dataset.version != DATASET_VERSION {
            return Err(CityDatasetError::UnsupportedVersion(dataset.version));
        }
        Self::new(dataset.cities)
    }

    /// Load a dataset file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CityDatasetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load `path` if given, the bundled dataset otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen dataset cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self, CityDatasetError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    /// The first city (in dataset order) whose outline contains `point`.
    #[must_use]
    pub fn detect_city_boundary(&self, point: Coordinate) -> Option<&Arc<CityBoundary>> {
        self.cities.iter().find(|city| city.contains(point))
    }

    /// All cities in dataset order.
    #[must_use]
    pub fn cities(&self) -> &[Arc<CityBoundary>] {
        &self.cities
    }

    /// Look up a city by id.
    #[must_use]
    pub fn get(&self, id: CityId) -> Option<&Arc<CityBoundary>> {
        self.cities.iter().find(|city| city.id == id)
    }

    /// Number of cities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether the index has no cities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Pairs of cities whose outlines share at least one point, earlier city first.
    #[must_use]
    pub fn overlapping_pairs(&self) -> Vec<(&CityBoundary, &CityBoundary)> {
        let mut pairs = Vec::new();
        for (i, first) in self.cities.iter().enumerate() {
            for second in self.cities.iter().skip(i + 1) {
                if first.polygon.intersects(&second.polygon) {
                    pairs.push((first.as_ref(), second.as_ref()));
                }
            }
        }
        pairs
    }
}
