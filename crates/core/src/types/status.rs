//! Status enums for access decisions and saved locations.

use serde::{Deserialize, Serialize};

/// What a user may do at a given location.
///
/// This is the three-state classification without the lookup-failure case;
/// a failed lookup has no access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Inside a served city and an active delivery zone: ordering allowed.
    Full,
    /// Inside a served city but outside every active zone: browsing only.
    ViewingOnly,
    /// Outside every served city.
    None,
}

impl AccessLevel {
    /// Whether orders may be placed.
    #[must_use]
    pub const fn can_order(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Whether the catalogue may be browsed.
    #[must_use]
    pub const fn can_browse(&self) -> bool {
        matches!(self, Self::Full | Self::ViewingOnly)
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::ViewingOnly => write!(f, "viewing_only"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Kind of a saved user location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "geofence.location_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Home,
    Work,
    #[default]
    Other,
    /// Detected from the device's GPS rather than entered by the user.
    Current,
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Work => write!(f, "work"),
            Self::Other => write!(f, "other"),
            Self::Current => write!(f, "current"),
        }
    }
}

impl std::str::FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "work" => Ok(Self::Work),
            "other" => Ok(Self::Other),
            "current" => Ok(Self::Current),
            _ => Err(format!("invalid location type: {s}")),
        }
    }
}
