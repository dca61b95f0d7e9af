use serde::{Deserialize, Serialize};

/// Kilometers per degree of latitude (and of longitude at the equator)
const KM_PER_DEGREE: f64 = 111.0;

/// Geographic bounding box in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Calculate bounding box from center point and radius
    ///
    /// # Arguments
    /// * `center` - (lat, lon) center point
    /// * `radius_m` - Radius in meters
    pub fn around(center: (f64, f64), radius_m: u32) -> Self {
        let (lat, lon) = center;
        let radius_km = radius_m as f64 / 1000.0;

        // 1 degree longitude ≈ 111 km * cos(lat); keep the divisor away from
        // zero near the poles
        let lat_delta = radius_km / KM_PER_DEGREE;
        let lon_delta = radius_km / (KM_PER_DEGREE * lat.to_radians().cos().max(0.01));

        Self {
            south: (lat - lat_delta).max(-90.0),
            north: (lat + lat_delta).min(90.0),
            west: (lon - lon_delta).max(-180.0),
            east: (lon + lon_delta).min(180.0),
        }
    }

    /// Shrink to `center ± radius_m` when this box reaches further than that
    /// from `center` in any direction; otherwise return it unchanged.
    pub fn clamp_around(&self, center: (f64, f64), radius_m: u32) -> Self {
        let limit = Self::around(center, radius_m);
        if self.south >= limit.south
            && self.north <= limit.north
            && self.west >= limit.west
            && self.east <= limit.east
        {
            *self
        } else {
            limit
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
            && self.west <= self.east
    }

    /// Overpass QL bbox filter body: `south,west,north,east`
    pub fn to_overpass(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.south, self.west, self.north, self.east
        )
    }
}
