//! Parcel types

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// A parcel to pick up at a warehouse and deliver to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Volume in the same unit as truck capacity
    pub volume: f64,
    /// Pickup warehouse; `None`, zero and negative ids are not plannable
    pub warehouse_id: Option<i64>,
    /// Pickup coordinates (the warehouse location)
    pub pickup: Coordinates,
    /// Delivery coordinates
    pub delivery: Coordinates,
    #[serde(default)]
    pub recipient: Recipient,
}

/// Recipient metadata carried through to the route stops
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Parcel {
    /// Warehouse id if it identifies a real warehouse
    pub fn valid_warehouse_id(&self) -> Option<i64> {
        self.warehouse_id.filter(|id| *id > 0)
    }
}
