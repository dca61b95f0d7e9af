use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::BoundingBox;

/// Administrative granularity of a geocoding attempt, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Area,
    District,
    State,
    Country,
}

impl Level {
    /// All levels ordered from most to least specific.
    pub const ALL: [Level; 4] = [Level::Area, Level::District, Level::State, Level::Country];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Area => "area",
            Level::District => "district",
            Level::State => "state",
            Level::Country => "country",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free-text place description as supplied by the caller.
///
/// Fields are trimmed on construction. An empty field means "not given"
/// and its level is skipped during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationQuery {
    pub country: String,
    pub state: String,
    pub district: String,
    pub area: String,
}

impl LocationQuery {
    pub fn new(
        country: impl Into<String>,
        state: impl Into<String>,
        district: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into().trim().to_string(),
            state: state.into().trim().to_string(),
            district: district.into().trim().to_string(),
            area: area.into().trim().to_string(),
        }
    }

    pub fn field(&self, level: Level) -> &str {
        match level {
            Level::Area => &self.area,
            Level::District => &self.district,
            Level::State => &self.state,
            Level::Country => &self.country,
        }
    }

    pub fn is_empty(&self) -> bool {
        Level::ALL.iter().all(|l| self.field(*l).is_empty())
    }

    /// Free-text address for a level: that level's field followed by every
    /// broader non-empty field, e.g. "Shibuya, Tokyo, Japan".
    ///
    /// Returns `None` when the level's own field is empty.
    pub fn search_string(&self, level: Level) -> Option<String> {
        if self.field(level).is_empty() {
            return None;
        }

        let parts: Vec<&str> = Level::ALL
            .iter()
            .filter(|l| **l >= level)
            .map(|l| self.field(*l))
            .filter(|f| !f.is_empty())
            .collect();

        Some(parts.join(", "))
    }

    /// The place name used in summary messages: the most specific given field.
    pub fn focus_name(&self) -> &str {
        Level::ALL
            .iter()
            .map(|l| self.field(*l))
            .find(|f| !f.is_empty())
            .unwrap_or("")
    }
}

/// A geocoded candidate area produced by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArea {
    /// (lat, lon)
    pub centroid: (f64, f64),
    pub bbox: Option<BoundingBox>,
    pub level: Level,
    /// The caller's text for this level (e.g. "Shibuya").
    pub label: String,
    /// The address string that was geocoded.
    pub search: String,
    /// Provider's display name for the match.
    pub display_name: String,
}
