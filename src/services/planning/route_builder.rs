//! Stop list construction for one truck
//!
//! A route is always DEPOT, WAREHOUSE, then one CUSTOMER stop per distinct
//! delivery coordinate. Matrix index `i` corresponds to stop `i`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::routing::DistanceTimeMatrices;
use crate::types::{Coordinates, Stop, StopKind, TruckAssignment};

/// Index of the warehouse stop in every route
pub const WAREHOUSE_INDEX: usize = 1;

/// Order in which customer stops are visited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSequencing {
    /// Order of first appearance in the assignment
    #[default]
    FirstSeen,
    /// Greedy nearest neighbor starting at the warehouse
    NearestNeighbor,
}

impl FromStr for RouteSequencing {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_seen" => Ok(Self::FirstSeen),
            "nearest_neighbor" => Ok(Self::NearestNeighbor),
            other => anyhow::bail!("unknown route sequencing '{}'", other),
        }
    }
}

/// Build the stop list for one truck.
///
/// Parcels with exactly the same delivery coordinate share one CUSTOMER stop.
/// Customer stops are never merged into the depot or warehouse stop, even
/// when the coordinates coincide.
pub fn build_stops(
    assignment: &TruckAssignment,
    depot: Coordinates,
    warehouse: Coordinates,
) -> Vec<Stop> {
    let mut stops = vec![
        Stop::new(depot, StopKind::Depot),
        Stop::new(warehouse, StopKind::Warehouse),
    ];

    for parcel in &assignment.parcels {
        let existing = stops
            .iter_mut()
            .skip(WAREHOUSE_INDEX + 1)
            .find(|stop| stop.coordinates == parcel.delivery);

        match existing {
            Some(stop) => stop.parcels.push(parcel.clone()),
            None => {
                let mut stop = Stop::new(parcel.delivery, StopKind::Customer);
                stop.parcels.push(parcel.clone());
                stops.push(stop);
            }
        }
    }

    stops
}

/// Warehouse coordinate for a truck: the known warehouse location, or the
/// pickup point of its first parcel.
pub fn warehouse_location(
    known: Option<Coordinates>,
    assignment: &TruckAssignment,
) -> Option<Coordinates> {
    known.or_else(|| assignment.parcels.first().map(|p| p.pickup))
}

pub fn stop_coordinates(stops: &[Stop]) -> Vec<Coordinates> {
    stops.iter().map(|s| s.coordinates).collect()
}

/// Total (km, minutes) along the stop order, including the return to the depot.
/// Durations are travel time only.
pub fn measure_route(stops: &[Stop], matrices: &DistanceTimeMatrices) -> (f64, f64) {
    if stops.len() < 2 {
        return (0.0, 0.0);
    }

    let mut distance = 0.0;
    let mut duration = 0.0;
    for i in 1..stops.len() {
        distance += matrices.distance(i - 1, i);
        duration += matrices.duration(i - 1, i);
    }

    let last = stops.len() - 1;
    distance += matrices.distance(last, 0);
    duration += matrices.duration(last, 0);

    (distance, duration)
}

/// Visit order of customer stops by the nearest-neighbor heuristic.
///
/// Returns stop indices (all `> WAREHOUSE_INDEX`) starting from the
/// warehouse. Ties go to the lower index.
pub fn nearest_neighbor_order(matrices: &DistanceTimeMatrices) -> Vec<usize> {
    let n = matrices.size;
    if n <= WAREHOUSE_INDEX + 1 {
        return vec![];
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n - WAREHOUSE_INDEX - 1);
    let mut current = WAREHOUSE_INDEX;

    for _ in (WAREHOUSE_INDEX + 1)..n {
        let mut best_next = None;
        let mut best_distance = f64::INFINITY;

        for (j, seen) in visited.iter().enumerate().skip(WAREHOUSE_INDEX + 1) {
            if !seen {
                let dist = matrices.distance(current, j);
                if dist < best_distance || best_next.is_none() {
                    best_distance = dist;
                    best_next = Some(j);
                }
            }
        }

        if let Some(next) = best_next {
            visited[next] = true;
            order.push(next);
            current = next;
        }
    }

    order
}

/// Reorder customer stops in place and return the matrices permuted to match
pub fn sequence_nearest_neighbor(
    stops: &mut Vec<Stop>,
    matrices: &DistanceTimeMatrices,
) -> DistanceTimeMatrices {
    let order: Vec<usize> = (0..=WAREHOUSE_INDEX)
        .chain(nearest_neighbor_order(matrices))
        .collect();
    if order.len() != stops.len() {
        return matrices.clone();
    }

    let mut original: Vec<Option<Stop>> = std::mem::take(stops).into_iter().map(Some).collect();
    *stops = order.iter().filter_map(|i| original[*i].take()).collect();

    submatrix(matrices, &order)
}

/// Matrices restricted to `order`, re-indexed so that entry `k` is `order[k]`
pub fn submatrix(matrices: &DistanceTimeMatrices, order: &[usize]) -> DistanceTimeMatrices {
    let pick = |source: &Vec<Vec<f64>>| -> Vec<Vec<f64>> {
        order
            .iter()
            .map(|i| order.iter().map(|j| source[*i][*j]).collect())
            .collect()
    };

    DistanceTimeMatrices {
        distances: pick(&matrices.distances),
        durations: pick(&matrices.durations),
        size: order.len(),
    }
}
