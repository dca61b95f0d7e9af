//! Facility aggregation across candidate areas.
//!
//! Candidates are consumed in order. Each one is queried, its entities are
//! normalized and deduplicated (first seen wins, so the most specific level
//! is kept), and distances are measured from the first candidate's centroid.
//! Aggregation stops as soon as `min_results` facilities are collected.
//! Short of that, boxes of growing radius around the first centroid are
//! queried until one brings the total up or the widening limit is reached.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{Deadline, SearchError, ensure_time_left};
use crate::api::{FacilitySource, Geocoder, ProviderError};
use crate::config::SearchConfig;
use crate::domain::{FacilityKey, FacilityRecord, ResolvedArea};
use crate::geometry::{BoundingBox, geodesic_km};
use crate::osm::{ParsedFacility, collapse_repeats, parse_facility};

/// Aggregated, sorted facilities plus the caller-facing summary
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub facilities: Vec<FacilityRecord>,
    pub message: String,
}

impl ResultSet {
    pub fn new(facilities: Vec<FacilityRecord>, focus: &str) -> Self {
        let message = summary_message(facilities.len(), focus);
        Self {
            facilities,
            message,
        }
    }

    pub fn count(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

/// "Found 1 hospital in X" / "Found 3 hospitals in X" / "No hospitals found in X"
pub fn summary_message(count: usize, focus: &str) -> String {
    match count {
        0 => format!("No hospitals found in {focus}"),
        1 => format!("Found 1 hospital in {focus}"),
        n => format!("Found {n} hospitals in {focus}"),
    }
}

/// Query box for a candidate: the provider's box clamped to a sane size, or a
/// fixed radius around the centroid when only a point is known.
pub fn query_box(area: &ResolvedArea, config: &SearchConfig) -> BoundingBox {
    match area.bbox {
        Some(bbox) if bbox.is_valid() => bbox.clamp_around(area.centroid, config.max_area_radius_m),
        _ => BoundingBox::around(area.centroid, config.fallback_radius_m),
    }
}

pub struct Aggregator<'a> {
    source: &'a dyn FacilitySource,
    reverse_geocoder: Option<&'a dyn Geocoder>,
    config: &'a SearchConfig,
    deadline: Deadline,
}

impl<'a> Aggregator<'a> {
    pub fn new(source: &'a dyn FacilitySource, config: &'a SearchConfig, deadline: Deadline) -> Self {
        Self {
            source,
            reverse_geocoder: None,
            config,
            deadline,
        }
    }

    /// Fill missing addresses through `geocoder`'s reverse lookup.
    pub fn with_reverse_geocoder(mut self, geocoder: &'a dyn Geocoder) -> Self {
        self.reverse_geocoder = Some(geocoder);
        self
    }

    /// Collect facilities from `candidates` until `min_results` is reached.
    ///
    /// When every candidate is used up short of `min_results`, boxes of
    /// growing radius around the first centroid are tried as a last resort.
    /// `focus` names the searched place in the summary message.
    pub fn aggregate<I>(&self, focus: &str, candidates: I) -> Result<ResultSet, SearchError>
    where
        I: IntoIterator<Item = Result<ResolvedArea, SearchError>>,
    {
        let min_results = self.config.min_results.max(1);
        let mut collected = Collected::default();
        let mut first: Option<ResolvedArea> = None;

        for candidate in candidates {
            let area = candidate?;
            // Distances stay relative to the most specific resolved centroid
            let origin = first.get_or_insert_with(|| area.clone()).centroid;

            self.collect(&area, query_box(&area, self.config), origin, &mut collected)?;
            if collected.records.len() >= min_results {
                break;
            }
        }

        let Some(first) = first else {
            return Err(SearchError::NoLocationFound {
                query: focus.to_string(),
            });
        };

        if collected.records.len() < min_results && collected.failures < collected.queried {
            for radius_m in self.config.widening_radii() {
                let ring = ResolvedArea {
                    bbox: None,
                    label: format!("within {} km", f64::from(radius_m) / 1000.0),
                    ..first.clone()
                };
                let bbox = BoundingBox::around(first.centroid, radius_m);
                self.collect(&ring, bbox, first.centroid, &mut collected)?;
                if collected.records.len() >= min_results {
                    break;
                }
            }
        }

        let Collected {
            mut records,
            queried,
            failures,
            last_error,
            ..
        } = collected;

        if let Some(last) = last_error
            && failures == queried
        {
            return Err(SearchError::SourceUnavailable {
                attempts: failures,
                last,
            });
        }

        sort_by_distance(&mut records);
        if let Some(max) = self.config.max_results {
            records.truncate(max);
        }

        for record in records.iter_mut().filter(|r| r.address.is_none()) {
            let address = self.lookup_address(record)?;
            record.address = Some(address);
        }

        Ok(ResultSet::new(records, focus))
    }

    /// Query one box and fold its facilities into `collected`.
    ///
    /// A failed query is recorded and skipped; an answer arriving after the
    /// deadline is discarded with `Timeout`.
    fn collect(
        &self,
        area: &ResolvedArea,
        bbox: BoundingBox,
        origin: (f64, f64),
        collected: &mut Collected,
    ) -> Result<(), SearchError> {
        ensure_time_left(&self.deadline)?;
        let start = Instant::now();
        collected.queried += 1;

        let outcome = self
            .source
            .query_facilities(&bbox, &self.config.kinds, &self.deadline);
        ensure_time_left(&self.deadline)?;

        let elements = match outcome {
            Ok(elements) => elements,
            Err(ProviderError::DeadlineExceeded { .. }) => {
                return Err(SearchError::timed_out(&self.deadline));
            }
            Err(e) => {
                warn!(level = %area.level, label = %area.label, error = %e, "facility query failed, skipping candidate");
                collected.failures += 1;
                collected.last_error = Some(e);
                return Ok(());
            }
        };

        let before = collected.records.len();
        for element in &elements {
            let parsed = match parse_facility(element, &self.config.kinds) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    debug!(%reason, "skipping malformed entity");
                    continue;
                }
            };

            let record = self.to_record(parsed, area, origin);
            let keys = record.identity_keys(self.config.dedup_precision);
            if keys.iter().any(|k| collected.seen.contains(k)) {
                debug!(name = %record.name, level = %area.level, "duplicate facility, keeping earlier one");
                continue;
            }
            collected.seen.extend(keys);
            collected.records.push(record);
        }

        info!(
            level = %area.level,
            label = %area.label,
            bbox = %bbox.to_overpass(),
            elements = elements.len(),
            added = collected.records.len() - before,
            total = collected.records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "aggregated candidate area"
        );
        Ok(())
    }

    fn to_record(&self, parsed: ParsedFacility, area: &ResolvedArea, origin: (f64, f64)) -> FacilityRecord {
        let distance_km = geodesic_km(origin, (parsed.lat, parsed.lon));
        // Without reverse lookups the candidate's own address stands in
        let address = parsed.address.or_else(|| {
            self.reverse_geocoder
                .is_none()
                .then(|| collapse_repeats(&area.search))
        });

        FacilityRecord {
            name: parsed.name,
            kind: parsed.kind,
            lat: parsed.lat,
            lon: parsed.lon,
            address,
            found_in: area.level,
            found_in_label: area.label.clone(),
            distance_km,
            source_id: parsed.source_id,
        }
    }

    fn lookup_address(&self, record: &FacilityRecord) -> Result<String, SearchError> {
        let fallback = || format!("Coordinates: ({}, {})", record.lat, record.lon);
        let Some(geocoder) = self.reverse_geocoder else {
            return Ok(fallback());
        };

        ensure_time_left(&self.deadline)?;
        let outcome = geocoder.reverse(record.lat, record.lon, &self.deadline);
        ensure_time_left(&self.deadline)?;

        match outcome {
            Ok(Some(address)) => Ok(address),
            Ok(None) => Ok(fallback()),
            Err(ProviderError::DeadlineExceeded { .. }) => Err(SearchError::timed_out(&self.deadline)),
            Err(e) => {
                warn!(name = %record.name, error = %e, "reverse geocoding failed");
                Ok(fallback())
            }
        }
    }
}

/// Running state of one aggregation
#[derive(Default)]
struct Collected {
    records: Vec<FacilityRecord>,
    seen: HashSet<FacilityKey>,
    queried: usize,
    failures: usize,
    last_error: Option<ProviderError>,
}

/// Ascending by distance; records without a distance trail in discovery order.
pub fn sort_by_distance(records: &mut [FacilityRecord]) {
    records.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
