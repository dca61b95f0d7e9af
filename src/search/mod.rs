//! The hospital search pipeline: resolve the location, then aggregate
//! facilities from the resolved candidate areas.

pub mod aggregator;
pub mod error;
pub mod resolver;
pub mod response;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::api::Deadline;
pub use aggregator::{Aggregator, ResultSet};
pub use error::SearchError;
pub(crate) use error::ensure_time_left;
pub use resolver::{Candidates, Resolver};
pub use response::{ErrorResponse, HospitalJson, HospitalsResponse};

use std::time::Instant;
use tracing::{info, warn};

use crate::api::{FacilitySource, Geocoder, NominatimClient, OverpassClient, ProviderError};
use crate::config::{FileConfig, SearchConfig};
use crate::domain::LocationQuery;

/// Resolver and aggregator wired to a geocoder and a facility source.
///
/// Safe to share between requests; the providers own the only shared state
/// (the geocoder's rate limiter).
pub struct HospitalFinder {
    geocoder: Box<dyn Geocoder>,
    source: Box<dyn FacilitySource>,
    config: SearchConfig,
}

impl HospitalFinder {
    pub fn new(
        geocoder: impl Geocoder + 'static,
        source: impl FacilitySource + 'static,
        config: SearchConfig,
    ) -> Self {
        Self {
            geocoder: Box::new(geocoder),
            source: Box::new(source),
            config,
        }
    }

    /// Build a finder backed by Nominatim and Overpass.
    pub fn from_config(config: &FileConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            NominatimClient::new(&config.nominatim)?,
            OverpassClient::new(&config.overpass)?,
            config.search.clone(),
        ))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the whole pipeline for one query.
    pub fn find(&self, query: &LocationQuery) -> Result<ResultSet, SearchError> {
        let start = Instant::now();
        let deadline = Deadline::after(self.config.timeout());
        info!(
            country = %query.country,
            state = %query.state,
            district = %query.district,
            area = %query.area,
            "starting hospital search"
        );

        let candidates = Resolver::new(self.geocoder.as_ref(), deadline).resolve(query)?;

        let mut aggregator = Aggregator::new(self.source.as_ref(), &self.config, deadline);
        if self.config.reverse_geocode {
            aggregator = aggregator.with_reverse_geocoder(self.geocoder.as_ref());
        }

        let result = aggregator.aggregate(query.focus_name(), candidates);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(set) => info!(count = set.count(), elapsed_ms, "search completed"),
            Err(e) => warn!(error = %e, elapsed_ms, "search failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Level;
    use crate::search::testing::{FakeGeocoder, FakeSource, facility};
    use std::time::Duration;

    fn shibuya() -> LocationQuery {
        LocationQuery::new("Japan", "Tokyo", "Shibuya", "Shibuya")
    }

    #[test]
    fn test_tokyo_general_hospital_scenario() {
        let geocoder = FakeGeocoder::new().with_hit("Shibuya, Shibuya, Tokyo, Japan", 35.6640, 139.6982);
        let source = FakeSource::new().respond(vec![facility(1, "Tokyo General Hospital", 35.6895, 139.6917)]);
        let finder = HospitalFinder::new(geocoder, source, SearchConfig::default());

        let result = finder.find(&shibuya()).unwrap();
        let json = serde_json::to_value(HospitalsResponse::from(&result)).unwrap();

        assert_eq!(json["message"], "Found 1 hospital in Shibuya");
        let hospital = &json["hospitals"][0];
        assert_eq!(hospital["name"], "Tokyo General Hospital");
        assert_eq!(hospital["type"], "hospital");
        assert_eq!(hospital["lat"], 35.6895);
        assert_eq!(hospital["lon"], 139.6917);
        assert_eq!(hospital["address"], "Shibuya, Tokyo, Japan");
        assert_eq!(hospital["found_in"], "Shibuya");
        assert!(hospital["distance"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_unresolvable_location_never_queries_source() {
        let source = FakeSource::new();
        let calls = source.call_log();
        let finder = HospitalFinder::new(FakeGeocoder::new(), source, SearchConfig::default());

        let err = finder.find(&shibuya()).err().unwrap();
        assert!(matches!(err, SearchError::NoLocationFound { .. }));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_min_results_never_reaches_state_or_country() {
        let geocoder = FakeGeocoder::new()
            .with_hit("Ebisu, Shibuya, Tokyo, Japan", 35.646, 139.710)
            .with_hit("Shibuya, Tokyo, Japan", 35.664, 139.698)
            .with_hit("Tokyo, Japan", 35.689, 139.692)
            .with_hit("Japan", 36.574, 139.239);
        let geocoder_calls = geocoder.call_log();
        let source = FakeSource::new()
            .respond((1..=3).map(|i| facility(i, &format!("A{i}"), 35.646, 139.71 + i as f64 * 0.001)).collect())
            .respond((4..=7).map(|i| facility(i, &format!("D{i}"), 35.664, 139.69 + i as f64 * 0.001)).collect());
        let source_calls = source.call_log();
        let config = SearchConfig {
            min_results: 5,
            ..SearchConfig::default()
        };
        let finder = HospitalFinder::new(geocoder, source, config);

        let result = finder.find(&LocationQuery::new("Japan", "Tokyo", "Shibuya", "Ebisu")).unwrap();
        assert_eq!(result.count(), 7);
        assert!(result.facilities.iter().all(|f| f.found_in <= Level::District));
        assert_eq!(source_calls.lock().unwrap().len(), 2);
        assert_eq!(
            *geocoder_calls.lock().unwrap(),
            vec!["Ebisu, Shibuya, Tokyo, Japan", "Shibuya, Tokyo, Japan"]
        );
    }

    #[test]
    fn test_district_fallback_when_area_unresolved() {
        let geocoder = FakeGeocoder::new().with_hit("Shibuya, Tokyo, Japan", 35.664, 139.698);
        let source = FakeSource::new().respond(vec![
            facility(1, "Clinic A", 35.66, 139.70),
            facility(2, "Clinic B", 35.67, 139.71),
        ]);
        let finder = HospitalFinder::new(geocoder, source, SearchConfig::default());

        let result = finder
            .find(&LocationQuery::new("Japan", "Tokyo", "Shibuya", "Nowhere-cho"))
            .unwrap();
        assert_eq!(result.count(), 2);
        assert!(result.facilities.iter().all(|f| f.found_in == Level::District));
        // Relative to the district centroid since the area did not resolve
        let a = result.facilities.iter().find(|f| f.name == "Clinic A").unwrap();
        let expected = crate::geometry::geodesic_km((35.664, 139.698), (35.66, 139.70)).unwrap();
        assert!((a.distance_km.unwrap() - expected).abs() < 1e-9);
        assert_eq!(result.message, "Found 2 hospitals in Nowhere-cho");
    }

    #[test]
    fn test_repeated_query_is_identical() {
        let build = || {
            let geocoder = FakeGeocoder::new().with_hit("Shibuya, Shibuya, Tokyo, Japan", 35.664, 139.698);
            let source = FakeSource::new().respond(vec![
                facility(1, "B", 35.67, 139.71),
                facility(2, "A", 35.665, 139.699),
            ]);
            HospitalFinder::new(geocoder, source, SearchConfig::default())
        };

        assert_eq!(build().find(&shibuya()).unwrap(), build().find(&shibuya()).unwrap());
    }

    #[test]
    fn test_ensure_time_left() {
        assert!(ensure_time_left(&Deadline::none()).is_ok());
        assert!(ensure_time_left(&Deadline::after(Duration::from_secs(60))).is_ok());
        assert!(matches!(
            ensure_time_left(&Deadline::after(Duration::ZERO)),
            Err(SearchError::Timeout(_))
        ));
    }

    #[test]
    fn test_slow_source_answer_is_a_timeout() {
        let geocoder = FakeGeocoder::new().with_hit("Shibuya, Shibuya, Tokyo, Japan", 35.664, 139.698);
        let source = FakeSource::new()
            .with_delay(Duration::from_millis(1200))
            .respond(vec![facility(1, "Late Hospital", 35.6895, 139.6917)]);
        let config = SearchConfig {
            timeout_secs: 1,
            ..SearchConfig::default()
        };
        let finder = HospitalFinder::new(geocoder, source, config);

        let start = Instant::now();
        let outcome = finder.find(&shibuya());
        assert!(matches!(outcome, Err(SearchError::Timeout(budget)) if budget == Duration::from_secs(1)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_slow_geocoder_answer_is_a_timeout() {
        let geocoder = FakeGeocoder::new()
            .with_delay(Duration::from_millis(1200))
            .with_hit("Shibuya, Shibuya, Tokyo, Japan", 35.664, 139.698);
        let source = FakeSource::new().respond(vec![facility(1, "Tokyo General Hospital", 35.6895, 139.6917)]);
        let source_calls = source.call_log();
        let config = SearchConfig {
            timeout_secs: 1,
            ..SearchConfig::default()
        };
        let finder = HospitalFinder::new(geocoder, source, config);

        assert!(matches!(finder.find(&shibuya()), Err(SearchError::Timeout(_))));
        assert!(source_calls.lock().unwrap().is_empty());
    }
}
