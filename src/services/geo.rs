// src/services/geo.rs
// DOCUMENTATION: Geographic helpers shared by tracking and geocoding

use geo_types::Point;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate distance between two coordinates in kilometers
/// Uses Haversine formula
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + (lat1.to_radians().cos()) * (lat2.to_radians().cos()) * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distance between two (lng, lat) points in kilometers
pub fn distance_between(a: Point<f64>, b: Point<f64>) -> f64 {
    calculate_distance(a.y(), a.x(), b.y(), b.x())
}

/// Total length of a path in kilometers
pub fn path_length(points: &[Point<f64>]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_between(pair[0], pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copenhagen_to_aarhus() {
        let d = calculate_distance(55.6761, 12.5683, 56.1629, 10.2039);
        // Roughly 157 km as the crow flies
        assert!(d > 150.0 && d < 165.0, "distance was {}", d);
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(calculate_distance(55.0, 12.0, 55.0, 12.0), 0.0);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let points = vec![
            Point::new(12.0, 55.0),
            Point::new(12.0, 55.1),
            Point::new(12.0, 55.2),
        ];
        let total = path_length(&points);
        let direct = distance_between(points[0], points[2]);
        assert!((total - direct).abs() < 1e-6);
        assert_eq!(path_length(&points[..1]), 0.0);
    }
}
