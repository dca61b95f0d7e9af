use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use super::{Deadline, GeocodeHit, Geocoder, ProviderError, RateLimiter, RetryPolicy, USER_AGENT};
use crate::config::NominatimConfig;
use crate::geometry::BoundingBox;

const PROVIDER: &str = "nominatim";

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
    /// [south, north, west, east]
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
}

impl NominatimResult {
    fn into_hit(self) -> Result<GeocodeHit, ProviderError> {
        let lat: f64 = self.lat.parse().map_err(|_| decode_error("latitude", &self.lat))?;
        let lon: f64 = self.lon.parse().map_err(|_| decode_error("longitude", &self.lon))?;
        let bbox = self.boundingbox.as_deref().and_then(parse_bbox);

        Ok(GeocodeHit {
            lat,
            lon,
            bbox,
            display_name: self.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResult {
    #[serde(default)]
    display_name: Option<String>,
}

fn decode_error(field: &str, value: &str) -> ProviderError {
    ProviderError::Decode {
        provider: PROVIDER,
        message: format!("invalid {field} '{value}'"),
    }
}

fn parse_bbox(raw: &[String]) -> Option<BoundingBox> {
    let values: Vec<f64> = raw.iter().filter_map(|v| v.parse().ok()).collect();
    let [south, north, west, east] = values.as_slice() else {
        return None;
    };
    let bbox = BoundingBox::new(*south, *west, *north, *east);
    bbox.is_valid().then_some(bbox)
}

/// Nominatim geocoding client.
///
/// Every request (forward and reverse) passes through one shared
/// [`RateLimiter`], so concurrent searches stay within the usage policy.
pub struct NominatimClient {
    client: reqwest::blocking::Client,
    base_url: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
    timeout: Duration,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(Duration::from_millis(config.min_interval_ms)),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_delay_ms),
            ),
            timeout,
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        deadline: &Deadline,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        self.retry.run(PROVIDER, deadline, || {
            if !self.limiter.acquire(deadline) {
                return Err(ProviderError::DeadlineExceeded { provider: PROVIDER });
            }

            let response = self
                .client
                .get(&url)
                .query(params)
                .timeout(deadline.request_timeout(self.timeout))
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
        })
    }
}

impl Geocoder for NominatimClient {
    fn geocode(&self, address: &str, deadline: &Deadline) -> Result<Option<GeocodeHit>, ProviderError> {
        debug!(address, "geocoding");

        let results: Vec<NominatimResult> = self.get_json(
            "search",
            &[("q", address), ("format", "json"), ("limit", "1")],
            deadline,
        )?;

        // Nominatim ranks results; the first one is the best match
        let hit = results.into_iter().next().map(NominatimResult::into_hit).transpose()?;

        match &hit {
            Some(h) => info!(address, lat = h.lat, lon = h.lon, display_name = %h.display_name, "geocoded"),
            None => info!(address, "no geocoding match"),
        }

        Ok(hit)
    }

    fn reverse(&self, lat: f64, lon: f64, deadline: &Deadline) -> Result<Option<String>, ProviderError> {
        let lat = lat.to_string();
        let lon = lon.to_string();
        let result: ReverseResult = self.get_json(
            "reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")],
            deadline,
        )?;
        Ok(result.display_name)
    }
}
