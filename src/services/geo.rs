//! Geographic calculations

use crate::types::Coordinates;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average speed in km/h for travel time estimation
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Travel time in minutes for a distance at a constant speed
pub fn travel_minutes(distance_km: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return 0.0;
    }
    (distance_km / speed_kmh) * 60.0
}

/// Pairwise great-circle distances scaled by `road_coefficient`.
/// `matrix[i][j]` is the distance from point i to point j in kilometers.
pub fn distance_matrix(points: &[Coordinates], road_coefficient: f64) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let distance = haversine_distance(&points[i], &points[j]) * road_coefficient;
            matrix[i][j] = distance;
            matrix[j][i] = distance;
        }
    }

    matrix
}
