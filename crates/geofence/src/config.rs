//! Geofence service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GEOFENCE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `GEOFENCE_HOST` - Bind address (default: 127.0.0.1)
//! - `GEOFENCE_PORT` - Listen port (default: 3000)
//! - `GEOFENCE_CITY_BOUNDARIES` - Path to a city boundary JSON file (default: bundled dataset)
//! - `GEOFENCE_ZONE_CACHE_TTL_SECS` - Zone lookup cache TTL, 0 disables caching, at most 86400 (default: 60)
//! - `GEOFENCE_ZONE_CACHE_CAPACITY` - Maximum cached zone lookups (default: 10000)
//! - `GEOFENCE_ZONE_QUERY_TIMEOUT_MS` - Zone query timeout (default: 5000)
//! - `GEOFENCE_LOG_JSON` - Emit JSON log lines instead of text (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Longest zone cache TTL accepted from the environment (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Geofence service configuration.
#[derive(Debug, Clone)]
pub struct GeofenceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// City boundary dataset override; `None` uses the bundled dataset
    pub city_boundaries_path: Option<PathBuf>,
    /// Zone lookup settings
    pub zones: ZoneLookupConfig,
    /// Structured JSON logs for log shippers; text otherwise
    pub log_json: bool,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Zone lookup cache and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneLookupConfig {
    /// How long a zone lookup stays cached. `None` disables the cache.
    pub cache_ttl: Option<Duration>,
    /// Maximum number of cached lookups.
    pub cache_capacity: u64,
    /// Upper bound on a single zone query.
    pub query_timeout: Duration,
}

impl Default for ZoneLookupConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Some(Duration::from_secs(60)),
            cache_capacity: 10_000,
            query_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Sentry settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN for error tracking
    pub dsn: Option<String>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate (0.0 - 1.0)
    pub sample_rate: f32,
    /// Trace sample rate (0.0 - 1.0)
    pub traces_sample_rate: f32,
}

impl GeofenceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("GEOFENCE_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("GEOFENCE_DATABASE_URL".to_string()))?;

        let host = parse_or_default(&lookup, "GEOFENCE_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or_default(&lookup, "GEOFENCE_PORT", 3000_u16)?;
        let city_boundaries_path = lookup("GEOFENCE_CITY_BOUNDARIES").map(PathBuf::from);
        let log_json = parse_or_default(&lookup, "GEOFENCE_LOG_JSON", false)?;

        let zones = ZoneLookupConfig::from_lookup(&lookup)?;
        let sentry = SentryConfig::from_lookup(&lookup)?;

        Ok(Self {
            database_url,
            host,
            port,
            city_boundaries_path,
            zones,
            log_json,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ZoneLookupConfig {
    /// Read zone lookup settings; every variable is optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but unparseable,
    /// or if the cache TTL exceeds `MAX_CACHE_TTL_SECS`.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let ttl_secs: u64 = parse_or_default(
            lookup,
            "GEOFENCE_ZONE_CACHE_TTL_SECS",
            defaults.cache_ttl.map_or(0, |d| d.as_secs()),
        )?;
        let cache_capacity =
            parse_or_default(lookup, "GEOFENCE_ZONE_CACHE_CAPACITY", defaults.cache_capacity)?;
        let timeout_ms: u64 = parse_or_default(lookup, "GEOFENCE_ZONE_QUERY_TIMEOUT_MS", 5_000)?;

        if ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::InvalidEnvVar(
                "GEOFENCE_ZONE_CACHE_TTL_SECS".to_string(),
                format!("must be at most {MAX_CACHE_TTL_SECS}"),
            ));
        }

        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GEOFENCE_ZONE_QUERY_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            cache_capacity,
            query_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

impl SentryConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: lookup("SENTRY_DSN"),
            environment: lookup("SENTRY_ENVIRONMENT"),
            sample_rate: parse_or_default(lookup, "SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: parse_or_default(lookup, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            GeofenceConfig::from_lookup(lookup_from(&[("GEOFENCE_DATABASE_URL", "postgres://x")]))
                .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://x");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.city_boundaries_path.is_none());
        assert_eq!(config.zones, ZoneLookupConfig::default());
        assert!(config.sentry.dsn.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            GeofenceConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://fly")])).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly");
    }

    #[test]
    fn test_missing_database_url() {
        let err = GeofenceConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "GEOFENCE_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = GeofenceConfig::from_lookup(lookup_from(&[
            ("GEOFENCE_DATABASE_URL", "postgres://x"),
            ("GEOFENCE_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "GEOFENCE_PORT"));
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let zones =
            ZoneLookupConfig::from_lookup(&lookup_from(&[("GEOFENCE_ZONE_CACHE_TTL_SECS", "0")]))
                .unwrap();
        assert!(zones.cache_ttl.is_none());
    }

    #[test]
    fn test_zone_overrides() {
        let zones = ZoneLookupConfig::from_lookup(&lookup_from(&[
            ("GEOFENCE_ZONE_CACHE_TTL_SECS", "300"),
            ("GEOFENCE_ZONE_CACHE_CAPACITY", "50"),
            ("GEOFENCE_ZONE_QUERY_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(zones.cache_ttl, Some(Duration::from_secs(300)));
        assert_eq!(zones.cache_capacity, 50);
        assert_eq!(zones.query_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ZoneLookupConfig::from_lookup(&lookup_from(&[(
            "GEOFENCE_ZONE_QUERY_TIMEOUT_MS",
            "0",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let err = ZoneLookupConfig::from_lookup(&lookup_from(&[(
            "GEOFENCE_ZONE_CACHE_TTL_SECS",
            "99999999999",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "GEOFENCE_ZONE_CACHE_TTL_SECS"));

        let zones = ZoneLookupConfig::from_lookup(&lookup_from(&[(
            "GEOFENCE_ZONE_CACHE_TTL_SECS",
            "86400",
        )]))
        .unwrap();
        assert_eq!(zones.cache_ttl, Some(Duration::from_secs(MAX_CACHE_TTL_SECS)));
    }

    #[test]
    fn test_city_boundaries_path() {
        let config = GeofenceConfig::from_lookup(lookup_from(&[
            ("GEOFENCE_DATABASE_URL", "postgres://x"),
            ("GEOFENCE_CITY_BOUNDARIES", "/etc/dayliz/cities.json"),
        ]))
        .unwrap();
        assert_eq!(
            config.city_boundaries_path,
            Some(PathBuf::from("/etc/dayliz/cities.json"))
        );
    }
}
