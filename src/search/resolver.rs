//! Location resolution: geocode the query from the most to the least
//! specific level, lazily.
//!
//! Flow: area → district → state → country. Empty fields are skipped,
//! levels without a match are skipped, and provider failures are logged and
//! skipped. Only when nothing resolves does resolution fail.

use tracing::{debug, info, warn};

use super::{Deadline, SearchError, ensure_time_left};
use crate::api::{Geocoder, ProviderError};
use crate::domain::{Level, LocationQuery, ResolvedArea};

pub struct Resolver<'a> {
    geocoder: &'a dyn Geocoder,
    deadline: Deadline,
}

impl<'a> Resolver<'a> {
    pub fn new(geocoder: &'a dyn Geocoder, deadline: Deadline) -> Self {
        Self { geocoder, deadline }
    }

    /// Resolve the most specific level eagerly and return the rest as a lazy
    /// sequence.
    ///
    /// Fails with `NoLocationFound` when no level matched, or with
    /// `SourceUnavailable` when every attempted lookup errored.
    pub fn resolve(&self, query: &LocationQuery) -> Result<Candidates<'a>, SearchError> {
        let mut candidates = Candidates {
            geocoder: self.geocoder,
            query: query.clone(),
            levels: Level::ALL.into_iter(),
            deadline: self.deadline,
            first: None,
            attempts: 0,
            failures: 0,
            last_error: None,
            done: false,
        };

        match candidates.advance()? {
            Some(first) => {
                candidates.first = Some(first);
                Ok(candidates)
            }
            None => Err(candidates.exhausted_error()),
        }
    }
}

/// Lazily geocoded candidate areas, most specific first.
///
/// Dropping it early performs no further lookups. The only error item is a
/// deadline expiry, after which the sequence ends.
pub struct Candidates<'a> {
    geocoder: &'a dyn Geocoder,
    query: LocationQuery,
    levels: std::array::IntoIter<Level, 4>,
    deadline: Deadline,
    first: Option<ResolvedArea>,
    attempts: usize,
    failures: usize,
    last_error: Option<ProviderError>,
    done: bool,
}

impl Candidates<'_> {
    fn advance(&mut self) -> Result<Option<ResolvedArea>, SearchError> {
        for level in self.levels.by_ref() {
            let Some(search) = self.query.search_string(level) else {
                continue;
            };

            ensure_time_left(&self.deadline)?;
            self.attempts += 1;

            let lookup = self.geocoder.geocode(&search, &self.deadline);
            // A late answer is discarded
            ensure_time_left(&self.deadline)?;

            match lookup {
                Err(ProviderError::DeadlineExceeded { .. }) => {
                    return Err(SearchError::timed_out(&self.deadline));
                }
                Ok(Some(hit)) => {
                    info!(%level, search = %search, lat = hit.lat, lon = hit.lon, "resolved candidate area");
                    return Ok(Some(ResolvedArea {
                        centroid: (hit.lat, hit.lon),
                        bbox: hit.bbox,
                        level,
                        label: self.query.field(level).to_string(),
                        search,
                        display_name: hit.display_name,
                    }));
                }
                Ok(None) => debug!(%level, search = %search, "no match, trying broader level"),
                Err(e) => {
                    warn!(%level, search = %search, error = %e, "geocoding failed, trying broader level");
                    self.failures += 1;
                    self.last_error = Some(e);
                }
            }
        }
        Ok(None)
    }

    fn exhausted_error(&mut self) -> SearchError {
        match self.last_error.take() {
            Some(last) if self.failures == self.attempts => SearchError::SourceUnavailable {
                attempts: self.failures,
                last,
            },
            _ => SearchError::NoLocationFound {
                query: Level::ALL
                    .iter()
                    .find_map(|l| self.query.search_string(*l))
                    .unwrap_or_default(),
            },
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = Result<ResolvedArea, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(first) = self.first.take() {
            return Some(Ok(first));
        }
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(Some(area)) => Some(Ok(area)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::FakeGeocoder;
    use std::time::Duration;

    fn tokyo() -> LocationQuery {
        LocationQuery::new("Japan", "Tokyo", "Shibuya", "Ebisu")
    }

    fn levels(candidates: Candidates<'_>) -> Vec<Level> {
        candidates.map(|c| c.unwrap().level).collect()
    }

    #[test]
    fn test_yields_levels_most_specific_first() {
        let geocoder = FakeGeocoder::new()
            .with_hit("Ebisu, Shibuya, Tokyo, Japan", 35.646, 139.710)
            .with_hit("Shibuya, Tokyo, Japan", 35.664, 139.698)
            .with_hit("Tokyo, Japan", 35.689, 139.692)
            .with_hit("Japan", 36.574, 139.239);

        let candidates = Resolver::new(&geocoder, Deadline::none()).resolve(&tokyo()).unwrap();
        assert_eq!(
            levels(candidates),
            vec![Level::Area, Level::District, Level::State, Level::Country]
        );
    }

    #[test]
    fn test_unmatched_levels_are_skipped() {
        let geocoder = FakeGeocoder::new()
            .with_hit("Tokyo, Japan", 35.689, 139.692)
            .with_hit("Japan", 36.574, 139.239);

        let candidates = Resolver::new(&geocoder, Deadline::none()).resolve(&tokyo()).unwrap();
        assert_eq!(levels(candidates), vec![Level::State, Level::Country]);
    }

    #[test]
    fn test_empty_fields_are_not_geocoded() {
        let geocoder = FakeGeocoder::new().with_hit("Pune, India", 18.52, 73.85);
        let query = LocationQuery::new("India", "", "Pune", "");

        let candidates = Resolver::new(&geocoder, Deadline::none()).resolve(&query).unwrap();
        assert_eq!(levels(candidates), vec![Level::District]);
        assert_eq!(geocoder.calls(), vec!["Pune, India", "India"]);
    }

    #[test]
    fn test_is_lazy() {
        let geocoder = FakeGeocoder::new()
            .with_hit("Ebisu, Shibuya, Tokyo, Japan", 35.646, 139.710)
            .with_hit("Shibuya, Tokyo, Japan", 35.664, 139.698);

        let mut candidates = Resolver::new(&geocoder, Deadline::none()).resolve(&tokyo()).unwrap();
        assert_eq!(geocoder.calls().len(), 1);

        let first = candidates.next().unwrap().unwrap();
        assert_eq!(first.label, "Ebisu");
        assert_eq!(first.search, "Ebisu, Shibuya, Tokyo, Japan");
        assert_eq!(geocoder.calls().len(), 1);

        candidates.next().unwrap().unwrap();
        assert_eq!(geocoder.calls().len(), 2);
    }

    #[test]
    fn test_no_location_found() {
        let geocoder = FakeGeocoder::new();
        let err = Resolver::new(&geocoder, Deadline::none())
            .resolve(&tokyo())
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::NoLocationFound { .. }));
        assert_eq!(geocoder.calls().len(), 4);
    }

    #[test]
    fn test_provider_failures_are_skipped() {
        let geocoder = FakeGeocoder::new()
            .failing("Ebisu, Shibuya, Tokyo, Japan")
            .with_hit("Shibuya, Tokyo, Japan", 35.664, 139.698);

        let candidates = Resolver::new(&geocoder, Deadline::none()).resolve(&tokyo()).unwrap();
        assert_eq!(levels(candidates), vec![Level::District]);
    }

    #[test]
    fn test_all_lookups_failing_is_source_unavailable() {
        let geocoder = FakeGeocoder::new()
            .failing("Ebisu, Shibuya, Tokyo, Japan")
            .failing("Shibuya, Tokyo, Japan")
            .failing("Tokyo, Japan")
            .failing("Japan");

        let err = Resolver::new(&geocoder, Deadline::none())
            .resolve(&tokyo())
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::SourceUnavailable { attempts: 4, .. }));
    }

    #[test]
    fn test_expired_deadline() {
        let geocoder = FakeGeocoder::new().with_hit("Japan", 36.574, 139.239);
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let err = Resolver::new(&geocoder, deadline).resolve(&tokyo()).err().unwrap();
        assert!(matches!(err, SearchError::Timeout(_)));
        assert!(geocoder.calls().is_empty());
    }

    #[test]
    fn test_late_match_is_discarded() {
        let geocoder = FakeGeocoder::new()
            .with_delay(Duration::from_millis(150))
            .with_hit("Ebisu, Shibuya, Tokyo, Japan", 35.646, 139.710);
        let deadline = Deadline::after(Duration::from_millis(50));

        let err = Resolver::new(&geocoder, deadline).resolve(&tokyo()).err().unwrap();
        assert!(matches!(err, SearchError::Timeout(_)));
        assert_eq!(geocoder.calls().len(), 1);
    }

    struct OutOfTime;

    impl Geocoder for OutOfTime {
        fn geocode(&self, _address: &str, _deadline: &Deadline) -> Result<Option<crate::api::GeocodeHit>, ProviderError> {
            Err(ProviderError::DeadlineExceeded { provider: "nominatim" })
        }
    }

    #[test]
    fn test_provider_deadline_is_a_timeout_not_an_outage() {
        let err = Resolver::new(&OutOfTime, Deadline::none())
            .resolve(&tokyo())
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::Timeout(_)));
    }
}
