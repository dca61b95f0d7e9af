use serde::Serialize;

use super::ResultSet;
use crate::domain::{FacilityKind, FacilityRecord};

/// JSON body returned to the caller
#[derive(Debug, Serialize)]
pub struct HospitalsResponse {
    pub hospitals: Vec<HospitalJson>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HospitalJson {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FacilityKind,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
    pub found_in: String,
    /// Kilometers from the search focus
    pub distance: Option<f64>,
}

impl From<&FacilityRecord> for HospitalJson {
    fn from(record: &FacilityRecord) -> Self {
        Self {
            name: record.name.clone(),
            kind: record.kind,
            lat: record.lat,
            lon: record.lon,
            address: record.address.clone(),
            found_in: record.found_in_label.clone(),
            distance: record.distance_km,
        }
    }
}

impl From<&ResultSet> for HospitalsResponse {
    fn from(result: &ResultSet) -> Self {
        Self {
            hospitals: result.facilities.iter().map(HospitalJson::from).collect(),
            message: result.message.clone(),
        }
    }
}

impl HospitalsResponse {
    /// An empty answer carrying only the summary message
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            hospitals: Vec::new(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
