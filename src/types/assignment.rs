//! Truck assignment results

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Parcel;

/// Parcels loaded on one truck
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckAssignment {
    pub truck_id: String,
    pub truck_name: String,
    /// Parcels in placement order
    pub parcels: Vec<Parcel>,
    /// Sum of parcel volumes, always <= `capacity`
    pub used_volume: f64,
    /// Truck capacity copied at assignment time
    pub capacity: f64,
}

impl TruckAssignment {
    pub fn remaining(&self) -> f64 {
        self.capacity - self.used_volume
    }
}

/// Parcel the strategy could not place on any truck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedParcel {
    pub parcel_id: String,
    pub volume: f64,
}

/// Outcome of assigning one warehouse partition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    /// True unless the assignment failed outright; unassigned parcels are not a failure
    pub success: bool,
    /// Only trucks that received at least one parcel
    pub assignments: Vec<TruckAssignment>,
    pub unassigned: Vec<UnassignedParcel>,
    pub capacity_used: f64,
    /// Total capacity of the trucks in `assignments`
    pub capacity_available: f64,
    pub utilization_percent: f64,
    /// Strategy that produced the result
    pub strategy: String,
}

impl AssignmentResult {
    /// Build a successful result and compute the aggregate figures
    pub fn new(
        assignments: Vec<TruckAssignment>,
        unassigned: Vec<UnassignedParcel>,
        strategy: impl Into<String>,
    ) -> Self {
        let capacity_used: f64 = assignments.iter().map(|a| a.used_volume).sum();
        let capacity_available: f64 = assignments.iter().map(|a| a.capacity).sum();
        let utilization_percent = if capacity_available > 0.0 {
            capacity_used / capacity_available * 100.0
        } else {
            0.0
        };

        Self {
            success: true,
            assignments,
            unassigned,
            capacity_used,
            capacity_available,
            utilization_percent,
            strategy: strategy.into(),
        }
    }

    /// Ids of trucks that received parcels
    pub fn used_truck_ids(&self) -> Vec<String> {
        self.assignments.iter().map(|a| a.truck_id.clone()).collect()
    }

    pub fn assigned_parcel_count(&self) -> usize {
        self.assignments.iter().map(|a| a.parcels.len()).sum()
    }

    /// Unload `parcel_ids` from their trucks and recompute the aggregate
    /// figures. Trucks left empty drop out of `assignments`.
    pub fn without_parcels(self, parcel_ids: &HashSet<String>) -> Self {
        let assignments = self
            .assignments
            .into_iter()
            .filter_map(|mut assignment| {
                assignment.parcels.retain(|p| !parcel_ids.contains(&p.id));
                if assignment.parcels.is_empty() {
                    return None;
                }
                assignment.used_volume = assignment.parcels.iter().map(|p| p.volume).sum();
                Some(assignment)
            })
            .collect();

        Self {
            success: self.success,
            ..Self::new(assignments, self.unassigned, self.strategy)
        }
    }
}
