//! In-memory providers for pipeline tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::api::{Deadline, Element, FacilitySource, GeocodeHit, Geocoder, ProviderError};
use crate::domain::{FacilityKind, FacilityKinds, FacilityRecord, Level, ResolvedArea};
use crate::geometry::BoundingBox;

#[derive(Default)]
pub struct FakeGeocoder {
    hits: HashMap<String, GeocodeHit>,
    failing: HashSet<String>,
    reverse: HashMap<String, String>,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

fn point_key(lat: f64, lon: f64) -> String {
    format!("{lat},{lon}")
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hit(mut self, address: &str, lat: f64, lon: f64) -> Self {
        self.hits.insert(
            address.to_string(),
            GeocodeHit {
                lat,
                lon,
                bbox: None,
                display_name: address.to_string(),
            },
        );
        self
    }

    /// Answer every lookup only after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, address: &str) -> Self {
        self.failing.insert(address.to_string());
        self
    }

    pub fn with_reverse(mut self, lat: f64, lon: f64, address: &str) -> Self {
        self.reverse.insert(point_key(lat, lon), address.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_log().lock().unwrap().clone()
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl Geocoder for FakeGeocoder {
    fn geocode(&self, address: &str, _deadline: &Deadline) -> Result<Option<GeocodeHit>, ProviderError> {
        self.calls.lock().unwrap().push(address.to_string());
        thread::sleep(self.delay);
        if self.failing.contains(address) {
            return Err(ProviderError::RateLimited { provider: "fake" });
        }
        Ok(self.hits.get(address).cloned())
    }

    fn reverse(&self, lat: f64, lon: f64, _deadline: &Deadline) -> Result<Option<String>, ProviderError> {
        Ok(self.reverse.get(&point_key(lat, lon)).cloned())
    }
}

/// Answers queries from a queue, in call order; an exhausted queue answers empty.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<VecDeque<Result<Vec<Element>, ProviderError>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<BoundingBox>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn respond(self, elements: Vec<Element>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(elements));
        self
    }

    pub fn fail(self) -> Self {
        self.responses.lock().unwrap().push_back(Err(ProviderError::Status {
            provider: "fake",
            status: 503,
        }));
        self
    }

    pub fn calls(&self) -> Vec<BoundingBox> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<BoundingBox>>> {
        Arc::clone(&self.calls)
    }
}

impl FacilitySource for FakeSource {
    fn query_facilities(
        &self,
        bbox: &BoundingBox,
        _kinds: &FacilityKinds,
        _deadline: &Deadline,
    ) -> Result<Vec<Element>, ProviderError> {
        self.calls.lock().unwrap().push(*bbox);
        thread::sleep(self.delay);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// A point-only candidate area
pub fn area(level: Level, label: &str, centroid: (f64, f64)) -> ResolvedArea {
    ResolvedArea {
        centroid,
        bbox: None,
        level,
        label: label.to_string(),
        search: label.to_string(),
        display_name: label.to_string(),
    }
}

/// An `amenity=hospital` node without address tags
pub fn facility(id: u64, name: &str, lat: f64, lon: f64) -> Element {
    let tags = [("amenity", "hospital"), ("name", name)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Element {
        type_: "node".to_string(),
        id: Some(id),
        tags: Some(tags),
        lat: Some(lat),
        lon: Some(lon),
        center: None,
    }
}

pub fn record(name: &str, distance_km: Option<f64>) -> FacilityRecord {
    FacilityRecord {
        name: name.to_string(),
        kind: FacilityKind::Clinic,
        lat: 0.0,
        lon: 0.0,
        address: None,
        found_in: Level::Area,
        found_in_label: "Somewhere".to_string(),
        distance_km,
        source_id: None,
    }
}
