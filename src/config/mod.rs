use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::FacilityKinds;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FileConfig {
    pub search: SearchConfig,
    pub nominatim: NominatimConfig,
    pub overpass: OverpassConfig,
    pub server: ServerConfig,
}

fn default_min_results() -> usize {
    1
}
fn default_fallback_radius() -> u32 {
    5000
}
fn default_max_area_radius() -> u32 {
    25_000
}
fn default_widen_step() -> u32 {
    5000
}
fn default_widen_max() -> u32 {
    50_000
}
fn default_dedup_precision() -> u32 {
    4
}
fn default_search_timeout_secs() -> u64 {
    60
}

/// Pipeline tuning
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Stop querying broader areas once this many facilities were collected
    #[serde(default = "default_min_results")]
    pub min_results: usize,
    /// Truncate the sorted result list
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Box radius used when a candidate has only a centroid
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius_m: u32,
    /// Provider boxes reaching further than this from their centroid are clamped
    #[serde(default = "default_max_area_radius")]
    pub max_area_radius_m: u32,
    /// Radius increment of the last-resort search around the first centroid
    #[serde(default = "default_widen_step")]
    pub widen_step_m: u32,
    /// Largest last-resort radius; 0 disables widening
    #[serde(default = "default_widen_max")]
    pub widen_max_m: u32,
    /// Decimal places kept when comparing coordinates for deduplication
    #[serde(default = "default_dedup_precision")]
    pub dedup_precision: u32,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    /// Look up missing addresses through the geocoder's reverse endpoint
    #[serde(default)]
    pub reverse_geocode: bool,
    #[serde(default)]
    pub kinds: FacilityKinds,
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Last-resort radii in increasing order, skipping those already covered
    /// by the point-only box.
    pub fn widening_radii(&self) -> impl Iterator<Item = u32> + '_ {
        let step = self.widen_step_m;
        (1..)
            .map_while(move |i: u32| step.checked_mul(i))
            .take_while(move |r| step > 0 && *r <= self.widen_max_m)
            .filter(move |r| *r > self.fallback_radius_m)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_results: default_min_results(),
            max_results: None,
            fallback_radius_m: default_fallback_radius(),
            max_area_radius_m: default_max_area_radius(),
            widen_step_m: default_widen_step(),
            widen_max_m: default_widen_max(),
            dedup_precision: default_dedup_precision(),
            timeout_secs: default_search_timeout_secs(),
            reverse_geocode: false,
            kinds: FacilityKinds::default(),
        }
    }
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_nominatim_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_nominatim_retry_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct NominatimConfig {
    #[serde(default = "default_nominatim_url")]
    pub url: String,
    /// Nominatim usage policy: at most one request per second
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_nominatim_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_nominatim_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            url: default_nominatim_url(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_nominatim_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_nominatim_retry_delay_ms(),
        }
    }
}

fn default_overpass_urls() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.private.coffee/api/interpreter".to_string(),
        "https://maps.mail.ru/osm/tools/overpass/api/interpreter".to_string(),
    ]
}
fn default_overpass_timeout_secs() -> u64 {
    25
}
fn default_overpass_retry_delay_ms() -> u64 {
    5000
}
#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    /// Mirrors, tried in order
    #[serde(default = "default_overpass_urls")]
    pub urls: Vec<String>,
    /// Server-side query timeout; the HTTP client waits a little longer
    #[serde(default = "default_overpass_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_overpass_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on elements returned per query. Overpass applies it in id
    /// order, before any distance sorting, so leave unset unless needed.
    #[serde(default)]
    pub max_elements: Option<u32>,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            urls: default_overpass_urls(),
            timeout_secs: default_overpass_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_overpass_retry_delay_ms(),
            max_elements: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl FileConfig {
    /// Load the first parseable config file from the standard locations,
    /// or the defaults if there is none.
    pub fn load() -> Self {
        for path in get_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::from_path(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config file");
                    return config;
                }
                Err(e) => warn!(error = %e, "ignoring config file"),
            }
        }
        Self::default()
    }

    /// Load an explicitly named config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("hospital-finder.toml"));
    paths.push(PathBuf::from(".hospital-finder.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("hospital-finder").join("config.toml"));
        paths.push(config_dir.join("hospital-finder.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".hospital-finder.toml"));
    }

    paths
}
