//! Dayliz Geofence library.
//!
//! Two-tier location access control: a local city-boundary check followed by
//! a delivery-zone lookup against the zone store, composed into a single
//! access decision.
//!
//! This crate provides the functionality as a library so the HTTP binary, the
//! CLI and the integration tests share one implementation.
//!
//! # Modules
//!
//! - [`cities`] - Bundled city boundary dataset and the city index
//! - [`zones`] - Delivery zone lookups (Postgres, cached, in-memory)
//! - [`access`] - The access level classifier and its result type
//! - [`db`] - Connection pool, zone and user location repositories
//! - [`routes`] - HTTP handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cities;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod zones;
