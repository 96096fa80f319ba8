//! Dayliz Core - Shared types library.
//!
//! This crate provides common types used across all Dayliz geofencing components:
//! - `geofence` - City/zone lookup, access classification and the HTTP service
//! - `cli` - Command-line tools for migrations, dataset checks and ad-hoc classification
//!
//! # Architecture
//!
//! The core crate contains only types and pure geometry - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere, including offline tooling.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, coordinates,
//!   polygons and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
