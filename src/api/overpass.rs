use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{Deadline, FacilitySource, ProviderError, RetryPolicy, USER_AGENT};
use crate::config::OverpassConfig;
use crate::domain::FacilityKinds;
use crate::geometry::BoundingBox;

const PROVIDER: &str = "overpass";

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Present on ways/relations queried with `out center`
    #[serde(default)]
    pub center: Option<Center>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

impl Element {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Node position, or the computed center of a way/relation.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self.center.map(|c| (c.lat, c.lon)),
        }
    }

    /// Stable identifier such as "node/123"
    pub fn source_id(&self) -> Option<String> {
        self.id.map(|id| format!("{}/{}", self.type_, id))
    }
}

/// Build the Overpass QL query for healthcare facilities inside `bbox`.
///
/// Tag values are generated from the accepted kind set and anchored so
/// `hospital` does not match `animal_hospital`. Output is unbounded unless
/// `max_elements` is set.
pub fn build_query(
    bbox: &BoundingBox,
    kinds: &FacilityKinds,
    timeout_secs: u64,
    max_elements: Option<u32>,
) -> String {
    let amenity = kinds
        .iter()
        .map(|k| k.amenity_tag())
        .collect::<Vec<_>>()
        .join("|");
    let healthcare = kinds
        .iter()
        .map(|k| k.healthcare_tag())
        .collect::<Vec<_>>()
        .join("|");
    let area = bbox.to_overpass();
    let limit = max_elements.map(|n| format!(" {n}")).unwrap_or_default();

    format!(
        r#"[out:json][timeout:{timeout_secs}];
(
  nwr["amenity"~"^({amenity})$"]({area});
  nwr["healthcare"~"^({healthcare})$"]({area});
);
out center tags{limit};"#
    )
}

/// Overpass client with mirror failover and retry on throttling.
pub struct OverpassClient {
    client: reqwest::blocking::Client,
    urls: Vec<String>,
    retry: RetryPolicy,
    timeout_secs: u64,
    request_timeout: Duration,
    max_elements: Option<u32>,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self, ProviderError> {
        if config.urls.is_empty() {
            return Err(ProviderError::NoEndpoint { provider: PROVIDER });
        }

        // Client timeout slightly higher than the server-side query timeout
        let request_timeout = Duration::from_secs(config.timeout_secs + 10);
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            urls: config.urls.clone(),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_delay_ms),
            ),
            timeout_secs: config.timeout_secs,
            request_timeout,
            max_elements: config.max_elements,
        })
    }

    /// Try each mirror in order; the first successful answer wins.
    fn execute(&self, query: &str, deadline: &Deadline) -> Result<OverpassResponse, ProviderError> {
        let mut last_error = None;

        for url in &self.urls {
            match self.retry.run(PROVIDER, deadline, || self.post(url, query, deadline)) {
                Ok(response) => return Ok(response),
                Err(e @ ProviderError::DeadlineExceeded { .. }) => return Err(e),
                Err(e) => {
                    warn!(url = %url, error = %e, "overpass mirror failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::NoEndpoint { provider: PROVIDER }))
    }

    fn post(&self, url: &str, query: &str, deadline: &Deadline) -> Result<OverpassResponse, ProviderError> {
        // Overpass API expects form-encoded POST data: data=<query>
        let response = self
            .client
            .post(url)
            .form(&[("data", query)])
            .timeout(deadline.request_timeout(self.request_timeout))
            .send()
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(PROVIDER, status.as_u16()));
        }

        response.json().map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

fn hit_limit(returned: usize, max_elements: Option<u32>) -> bool {
    max_elements.is_some_and(|max| returned >= max as usize)
}

impl FacilitySource for OverpassClient {
    fn query_facilities(
        &self,
        bbox: &BoundingBox,
        kinds: &FacilityKinds,
        deadline: &Deadline,
    ) -> Result<Vec<Element>, ProviderError> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query = build_query(bbox, kinds, self.timeout_secs, self.max_elements);
        let response = self.execute(&query, deadline)?;

        if hit_limit(response.elements.len(), self.max_elements) {
            warn!(
                bbox = %bbox.to_overpass(),
                max_elements = ?self.max_elements,
                "overpass output truncated at max_elements, nearest facilities may be missing"
            );
        }

        info!(
            bbox = %bbox.to_overpass(),
            elements = response.elements.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "overpass query finished"
        );

        Ok(response.elements)
    }
}
