//! City dataset commands.
//!
//! # Usage
//!
//! ```bash
//! # Served cities, in lookup order
//! dayliz cities list
//!
//! # Validate a candidate dataset before shipping it
//! dayliz cities check --file new_cities.json
//! ```

use std::path::Path;

use dayliz_geofence::cities::{CityBoundaryIndex, CityDatasetError};
use thiserror::Error;

/// Errors from the city dataset commands.
#[derive(Debug, Error)]
pub enum CitiesError {
    #[error("City dataset error: {0}")]
    Dataset(#[from] CityDatasetError),

    /// Overlapping cities make lookups depend on dataset order.
    #[error("{0} overlapping city pair(s) found")]
    Overlaps(usize),
}

/// Print every served city.
pub fn list(path: Option<&Path>) -> Result<(), CitiesError> {
    let index = CityBoundaryIndex::load(path)?;

    #[allow(clippy::print_stdout)]
    {
        for city in index.cities() {
            let bbox = city.polygon.bounding_box();
            println!(
                "{:>4}  {:<16} {:<12} lat {:.4}..{:.4}  lon {:.4}..{:.4}",
                city.id.to_string(),
                city.slug,
                city.state.as_deref().unwrap_or("-"),
                bbox.min_latitude,
                bbox.max_latitude,
                bbox.min_longitude,
                bbox.max_longitude,
            );
        }
    }
    Ok(())
}

/// Validate the dataset and fail if any two cities overlap.
pub fn check(path: Option<&Path>) -> Result<(), CitiesError> {
    let index = CityBoundaryIndex::load(path)?;
    let overlaps = index.overlapping_pairs();

    #[allow(clippy::print_stdout)]
    {
        for (first, second) in &overlaps {
            println!("overlap: {} ({}) and {} ({})", first.slug, first.id, second.slug, second.id);
        }
        println!("{} cities checked, {} overlap(s)", index.len(), overlaps.len());
    }

    if overlaps.is_empty() {
        Ok(())
    } else {
        Err(CitiesError::Overlaps(overlaps.len()))
    }
}
