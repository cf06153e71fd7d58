//! Greedy split of one truck's deliveries into shift-time blocks
//!
//! Deliveries are taken nearest first. A block closes at the first delivery
//! that would overrun it and that delivery opens the next block. Nothing is
//! backfilled into a closed block.

use crate::services::geo;
use crate::types::{ClusterResult, Coordinates, ShiftBlock};

/// Whole minutes one delivery takes: drive out from the warehouse plus service
pub fn estimated_minutes(distance_km: f64, avg_service_minutes: f64, avg_speed_kmh: f64) -> f64 {
    (geo::travel_minutes(distance_km, avg_speed_kmh) + avg_service_minutes).ceil()
}

/// Bucket deliveries into `blocks`.
///
/// `deliveries` pairs each delivery coordinate with its distance from the
/// warehouse in km. Shift indices in the result are positions in `blocks`;
/// blocks that receive nothing have no entry.
pub fn cluster_into_shifts(
    deliveries: &[(Coordinates, f64)],
    blocks: &[ShiftBlock],
    avg_service_minutes: f64,
    avg_speed_kmh: f64,
) -> ClusterResult {
    let mut sorted: Vec<(Coordinates, f64)> = deliveries.to_vec();
    // Stable: equal distances keep input order
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut result = ClusterResult::default();
    let mut next = 0;

    for (index, block) in blocks.iter().enumerate() {
        let available = block.available_minutes();
        let mut accumulated = 0.0;
        let mut shift = Vec::new();

        while let Some((coordinates, distance_km)) = sorted.get(next) {
            let needed = estimated_minutes(*distance_km, avg_service_minutes, avg_speed_kmh);
            if accumulated + needed > available {
                break;
            }
            accumulated += needed;
            shift.push(*coordinates);
            next += 1;
        }

        if !shift.is_empty() {
            result.shifts.insert(index, shift);
        }
    }

    result.undelivered = sorted[next..].iter().map(|(c, _)| *c).collect();
    result
}
