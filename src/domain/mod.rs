pub mod facility;
pub mod location;

pub use facility::{FacilityKey, FacilityKind, FacilityKinds, FacilityRecord};
pub use location::{Level, LocationQuery, ResolvedArea};
