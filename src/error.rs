//! Planning errors

use serde_json::json;
use thiserror::Error;

use crate::types::ErrorDetail;

/// Errors that fail a warehouse partition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("no trucks available for assignment")]
    NoTrucks,

    #[error("no parcels to assign")]
    NoParcels,

    #[error("truck '{truck_id}' has invalid capacity {capacity}")]
    InvalidCapacity { truck_id: String, capacity: f64 },

    #[error("parcel '{parcel_id}' has invalid volume {volume}")]
    InvalidVolume { parcel_id: String, volume: f64 },

    #[error("truck '{0}' not found in pool")]
    TruckNotFound(String),

    #[error("solver failed: {0}")]
    Solver(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PlanningError {
    /// Stable error code for responses
    pub const fn code(&self) -> &'static str {
        match self {
            PlanningError::NoTrucks => "NO_TRUCKS",
            PlanningError::NoParcels => "NO_PARCELS",
            PlanningError::InvalidCapacity { .. } => "INVALID_TRUCK_CAPACITY",
            PlanningError::InvalidVolume { .. } => "INVALID_PARCEL_VOLUME",
            PlanningError::TruckNotFound(_) => "TRUCK_NOT_FOUND",
            PlanningError::Solver(_) => "SOLVER_ERROR",
            PlanningError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Input problems detected before any assignment was attempted
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            PlanningError::NoTrucks
                | PlanningError::NoParcels
                | PlanningError::InvalidCapacity { .. }
                | PlanningError::InvalidVolume { .. }
        )
    }

    pub fn to_error_detail(&self) -> ErrorDetail {
        let detail = ErrorDetail::new(self.code(), self.to_string());
        match self {
            PlanningError::InvalidCapacity { truck_id, capacity } => {
                detail.with_details(json!({ "truckId": truck_id, "capacity": capacity }))
            }
            PlanningError::InvalidVolume { parcel_id, volume } => {
                detail.with_details(json!({ "parcelId": parcel_id, "volume": volume }))
            }
            PlanningError::TruckNotFound(truck_id) => {
                detail.with_details(json!({ "truckId": truck_id }))
            }
            _ => detail,
        }
    }
}
