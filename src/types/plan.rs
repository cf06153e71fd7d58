//! Planning request and response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssignmentResult, Depot, ErrorDetail, Parcel, TruckRoute, Warehouse};

/// Input of one planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    pub depot: Depot,
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
    pub parcels: Vec<Parcel>,
}

impl PlanningRequest {
    pub fn warehouse(&self, id: i64) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| w.id == id)
    }
}

/// Why a parcel is not on any route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UndeliveredReason {
    /// No truck had room for it
    NoTruckCapacity,
    /// Its truck could not reach it within the shift blocks
    NoShiftCapacity,
    /// Missing, zero or negative warehouse id
    InvalidWarehouse,
    /// Its warehouse partition failed
    PlanningFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndeliveredParcel {
    pub parcel_id: String,
    pub volume: f64,
    pub warehouse_id: Option<i64>,
    pub reason: UndeliveredReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UndeliveredParcel {
    pub fn new(parcel: &Parcel, reason: UndeliveredReason) -> Self {
        Self {
            parcel_id: parcel.id.clone(),
            volume: parcel.volume,
            warehouse_id: parcel.warehouse_id,
            reason,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Success,
    Failed,
}

/// Result for one warehouse partition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehousePlan {
    pub warehouse_id: i64,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentResult>,
    pub routes: Vec<TruckRoute>,
    /// Parcels of this warehouse that are not on a route
    pub undelivered: Vec<UndeliveredParcel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Output of one planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub trucks_used: usize,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub warehouses: Vec<WarehousePlan>,
    pub routes: Vec<TruckRoute>,
    /// Every parcel that is not on a route, across all warehouses
    pub undelivered: Vec<UndeliveredParcel>,
    /// Trucks marked unavailable by this run
    pub consumed_trucks: Vec<String>,
}
