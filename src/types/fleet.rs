//! Fleet types: trucks, depots and warehouses

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Truck as seen by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckInfo {
    /// Unique truck identifier
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Volume capacity
    pub capacity: f64,
    /// Availability flag from the system of record
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl TruckInfo {
    pub fn new(id: impl Into<String>, capacity: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            capacity,
            available: true,
        }
    }
}

/// Depot where trucks start and end their routes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depot {
    pub id: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub trucks: Vec<TruckInfo>,
}

/// Pickup warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: i64,
    pub coordinates: Coordinates,
}
