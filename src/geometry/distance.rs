use geo::{Distance, Geodesic, Point};

/// Geodesic distance in kilometers between two (lat, lon) points.
///
/// Returns `None` if either point has non-finite or out-of-range coordinates.
pub fn geodesic_km(from: (f64, f64), to: (f64, f64)) -> Option<f64> {
    if !is_valid_coord(from) || !is_valid_coord(to) {
        return None;
    }

    // geo points are (x = lon, y = lat)
    let a = Point::new(from.1, from.0);
    let b = Point::new(to.1, to.0);
    let meters = Geodesic::distance(a, b);

    meters.is_finite().then_some(meters / 1000.0)
}

fn is_valid_coord((lat, lon): (f64, f64)) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let d = geodesic_km((35.6895, 139.6917), (35.6895, 139.6917)).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Tokyo Station -> Shibuya Station is roughly 6.4 km
        let d = geodesic_km((35.6812, 139.7671), (35.6580, 139.7016)).unwrap();
        assert!((d - 6.4).abs() < 0.3, "got {d}");
    }

    #[test]
    fn test_invalid_coordinates() {
        assert_eq!(geodesic_km((f64::NAN, 0.0), (0.0, 0.0)), None);
        assert_eq!(geodesic_km((0.0, 0.0), (91.0, 0.0)), None);
    }
}
