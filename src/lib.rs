//! hospital_finder - Locate healthcare facilities near a place from OpenStreetMap data

pub mod api;
pub mod config;
pub mod domain;
pub mod geometry;
pub mod logging;
pub mod osm;
pub mod search;
pub mod server;

pub use domain::{FacilityKind, FacilityRecord, Level, LocationQuery};
pub use search::{HospitalFinder, ResultSet, SearchError};
