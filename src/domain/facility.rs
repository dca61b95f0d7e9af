use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::Level;

/// Healthcare category classification based on OSM `amenity` / `healthcare` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Hospital,
    Clinic,
    Dentist,
    Pharmacy,
    Doctor,
    Veterinary,
    NursingHome,
    HealthPost,
}

impl FacilityKind {
    pub const ALL: [FacilityKind; 8] = [
        FacilityKind::Hospital,
        FacilityKind::Clinic,
        FacilityKind::Dentist,
        FacilityKind::Pharmacy,
        FacilityKind::Doctor,
        FacilityKind::Veterinary,
        FacilityKind::NursingHome,
        FacilityKind::HealthPost,
    ];

    /// Classify an `amenity=*` tag value
    pub fn from_amenity_tag(tag: &str) -> Option<FacilityKind> {
        match tag {
            "hospital" => Some(FacilityKind::Hospital),
            "clinic" => Some(FacilityKind::Clinic),
            "dentist" => Some(FacilityKind::Dentist),
            "pharmacy" => Some(FacilityKind::Pharmacy),
            "doctors" => Some(FacilityKind::Doctor),
            "veterinary" => Some(FacilityKind::Veterinary),
            "nursing_home" => Some(FacilityKind::NursingHome),
            "health_post" => Some(FacilityKind::HealthPost),
            _ => None,
        }
    }

    /// Classify a `healthcare=*` tag value
    pub fn from_healthcare_tag(tag: &str) -> Option<FacilityKind> {
        match tag {
            "hospital" => Some(FacilityKind::Hospital),
            "clinic" => Some(FacilityKind::Clinic),
            "dentist" => Some(FacilityKind::Dentist),
            "pharmacy" => Some(FacilityKind::Pharmacy),
            "doctor" => Some(FacilityKind::Doctor),
            "veterinarian" => Some(FacilityKind::Veterinary),
            "nursing_home" => Some(FacilityKind::NursingHome),
            "health_post" => Some(FacilityKind::HealthPost),
            _ => None,
        }
    }

    pub fn amenity_tag(&self) -> &'static str {
        match self {
            FacilityKind::Doctor => "doctors",
            FacilityKind::Veterinary => "veterinary",
            other => other.as_str(),
        }
    }

    pub fn healthcare_tag(&self) -> &'static str {
        match self {
            FacilityKind::Doctor => "doctor",
            FacilityKind::Veterinary => "veterinarian",
            other => other.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityKind::Hospital => "hospital",
            FacilityKind::Clinic => "clinic",
            FacilityKind::Dentist => "dentist",
            FacilityKind::Pharmacy => "pharmacy",
            FacilityKind::Doctor => "doctor",
            FacilityKind::Veterinary => "veterinary",
            FacilityKind::NursingHome => "nursing_home",
            FacilityKind::HealthPost => "health_post",
        }
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The accepted category set. Matching is set membership, never substring tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityKinds(BTreeSet<FacilityKind>);

impl FacilityKinds {
    pub fn new(kinds: impl IntoIterator<Item = FacilityKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn contains(&self, kind: FacilityKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FacilityKind> + '_ {
        self.0.iter().copied()
    }

    /// Classify an element's tags against the accepted set.
    /// `healthcare` wins over `amenity` when both are accepted.
    pub fn classify(&self, amenity: Option<&str>, healthcare: Option<&str>) -> Option<FacilityKind> {
        let from_healthcare = healthcare.and_then(FacilityKind::from_healthcare_tag);
        let from_amenity = amenity.and_then(FacilityKind::from_amenity_tag);

        [from_healthcare, from_amenity]
            .into_iter()
            .flatten()
            .find(|k| self.contains(*k))
    }
}

impl Default for FacilityKinds {
    fn default() -> Self {
        Self::new(FacilityKind::ALL)
    }
}

/// A normalized healthcare facility.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRecord {
    pub name: String,
    pub kind: FacilityKind,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
    /// Level of the candidate area whose query first produced this record
    pub found_in: Level,
    /// Caller's text for `found_in`
    pub found_in_label: String,
    pub distance_km: Option<f64>,
    /// Stable source identifier such as "node/123"
    pub source_id: Option<String>,
}

/// Identity key used to drop duplicates across overlapping candidate areas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FacilityKey {
    Source(String),
    NamedPoint { name: String, lat: i64, lon: i64 },
}

impl FacilityRecord {
    /// Every key under which this record counts as already seen.
    ///
    /// `precision` is the number of decimal places kept when rounding
    /// coordinates for the name-based key.
    pub fn identity_keys(&self, precision: u32) -> Vec<FacilityKey> {
        let scale = 10f64.powi(precision.min(9) as i32);
        let mut keys = Vec::with_capacity(2);

        if let Some(ref id) = self.source_id {
            keys.push(FacilityKey::Source(id.clone()));
        }
        keys.push(FacilityKey::NamedPoint {
            name: self.name.trim().to_lowercase(),
            lat: (self.lat * scale).round() as i64,
            lon: (self.lon * scale).round() as i64,
        });

        keys
    }
}
