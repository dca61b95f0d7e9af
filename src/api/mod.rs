pub mod deadline;
pub mod error;
pub mod nominatim;
pub mod overpass;
pub mod rate_limit;
pub mod retry;

pub use deadline::Deadline;
pub use error::ProviderError;
pub use nominatim::NominatimClient;
pub use overpass::{Element, OverpassClient, OverpassResponse};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use crate::domain::FacilityKinds;
use crate::geometry::BoundingBox;

pub(crate) const USER_AGENT: &str = concat!("hospital_finder/", env!("CARGO_PKG_VERSION"));

/// Top-ranked geocoding match
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub lat: f64,
    pub lon: f64,
    pub bbox: Option<BoundingBox>,
    pub display_name: String,
}

/// Turns free-text addresses into coordinates.
///
/// Implementations give up with `ProviderError::DeadlineExceeded` rather
/// than wait or retry past `deadline`.
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the provider had no match.
    fn geocode(&self, address: &str, deadline: &Deadline) -> Result<Option<GeocodeHit>, ProviderError>;

    /// Human-readable address for a point, if the provider supports it.
    fn reverse(
        &self,
        _lat: f64,
        _lon: f64,
        _deadline: &Deadline,
    ) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}

/// Returns raw map entities tagged with one of the accepted healthcare kinds.
pub trait FacilitySource: Send + Sync {
    fn query_facilities(
        &self,
        bbox: &BoundingBox,
        kinds: &FacilityKinds,
        deadline: &Deadline,
    ) -> Result<Vec<Element>, ProviderError>;
}
