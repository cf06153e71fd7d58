//! Shift block types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Fixed work/break/traffic template for one continuous work period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftBlock {
    pub work_minutes: f64,
    pub break_minutes: f64,
    /// Extra minutes granted per hour of work for traffic
    pub traffic_buffer_per_hour: f64,
}

impl ShiftBlock {
    pub const fn new(work_minutes: f64, break_minutes: f64, traffic_buffer_per_hour: f64) -> Self {
        Self {
            work_minutes,
            break_minutes,
            traffic_buffer_per_hour,
        }
    }

    /// Minutes of delivery work the block can absorb
    pub fn available_minutes(&self) -> f64 {
        self.work_minutes - self.break_minutes
            + (self.work_minutes / 60.0) * self.traffic_buffer_per_hour
    }
}

/// Deliveries bucketed into shift blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    /// Shift index (zero based) to deliveries in visiting order
    pub shifts: BTreeMap<usize, Vec<Coordinates>>,
    /// Deliveries that fit no shift in this run
    pub undelivered: Vec<Coordinates>,
}

impl ClusterResult {
    pub fn delivered_count(&self) -> usize {
        self.shifts.values().map(Vec::len).sum()
    }
}
