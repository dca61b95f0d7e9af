use thiserror::Error;

use crate::api::Element;
use crate::domain::{FacilityKind, FacilityKinds};

/// Address components joined when `addr:full` is absent, in output order
const ADDRESS_KEYS: [&str; 5] = [
    "addr:housenumber",
    "addr:street",
    "addr:city",
    "addr:state",
    "addr:postcode",
];

/// Why a raw element could not become a facility. Such elements are skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEntity {
    #[error("{id} has no name")]
    MissingName { id: String },

    #[error("{id} has no coordinates")]
    MissingCoordinates { id: String },

    #[error("{id} is not an accepted healthcare kind")]
    UnsupportedKind { id: String },
}

/// A facility normalized from source tags, before area attribution and distance
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFacility {
    pub name: String,
    pub kind: FacilityKind,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
    pub source_id: Option<String>,
}

/// Normalize one Overpass element.
///
/// # Algorithm
/// 1. Classify by `healthcare` then `amenity` against the accepted set
/// 2. Require a name (`name`, then `name:en`)
/// 3. Require a position (node coordinates or way/relation center)
/// 4. Compose the address from `addr:full` or the individual `addr:*` tags
pub fn parse_facility(element: &Element, kinds: &FacilityKinds) -> Result<ParsedFacility, MalformedEntity> {
    let id = element
        .source_id()
        .unwrap_or_else(|| format!("{}/?", element.type_));

    let kind = kinds
        .classify(element.tag("amenity"), element.tag("healthcare"))
        .ok_or_else(|| MalformedEntity::UnsupportedKind { id: id.clone() })?;

    let name = ["name", "name:en"]
        .iter()
        .filter_map(|k| element.tag(k))
        .map(str::trim)
        .find(|n| !n.is_empty())
        .ok_or_else(|| MalformedEntity::MissingName { id: id.clone() })?
        .to_string();

    let (lat, lon) = element
        .position()
        .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
        .ok_or(MalformedEntity::MissingCoordinates { id })?;

    Ok(ParsedFacility {
        name,
        kind,
        lat,
        lon,
        address: compose_address(element),
        source_id: element.source_id(),
    })
}

fn compose_address(element: &Element) -> Option<String> {
    if let Some(full) = element.tag("addr:full").map(str::trim)
        && !full.is_empty()
    {
        return Some(full.to_string());
    }

    let components: Vec<&str> = ADDRESS_KEYS
        .iter()
        .filter_map(|k| element.tag(k))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    if components.is_empty() {
        None
    } else {
        Some(components.join(", "))
    }
}

/// Collapse adjacent repeated components: "Shibuya, Shibuya, Tokyo" -> "Shibuya, Tokyo"
pub fn collapse_repeats(address: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in address.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if parts
            .last()
            .is_none_or(|prev| !prev.eq_ignore_ascii_case(part))
        {
            parts.push(part);
        }
    }
    parts.join(", ")
}
