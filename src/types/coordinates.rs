//! Coordinates

use serde::{Deserialize, Serialize};

/// Geographic point in decimal degrees.
///
/// Equality is exact `f64` equality; stops are merged only when two
/// deliveries carry bit-for-bit the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}
