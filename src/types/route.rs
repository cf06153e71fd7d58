//! Route types

use serde::{Deserialize, Serialize};

use super::{ClusterResult, Coordinates, Parcel};

/// Role of a stop within a truck route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopKind {
    Depot,
    Warehouse,
    Customer,
}

/// A physical location a truck visits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub coordinates: Coordinates,
    pub kind: StopKind,
    /// Parcels delivered here (empty for depot and warehouse stops)
    pub parcels: Vec<Parcel>,
}

impl Stop {
    pub fn new(coordinates: Coordinates, kind: StopKind) -> Self {
        Self {
            coordinates,
            kind,
            parcels: Vec::new(),
        }
    }
}

/// Which path served a distance matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixSource {
    /// External routing service
    Primary,
    /// Local great-circle estimate
    Fallback,
}

/// Planned route of one truck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckRoute {
    pub truck_id: String,
    pub warehouse_id: i64,
    pub stops: Vec<Stop>,
    /// Distance along the stops including the return to the depot
    pub total_distance_km: f64,
    /// Travel time along the stops including the return to the depot
    pub total_duration_minutes: f64,
    /// Shift split, present only when the route did not fit one continuous shift
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shifts: Option<ClusterResult>,
    pub matrix_source: MatrixSource,
}

impl TruckRoute {
    pub fn customer_stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(|s| s.kind == StopKind::Customer)
    }

    pub fn parcel_count(&self) -> usize {
        self.stops.iter().map(|s| s.parcels.len()).sum()
    }
}
