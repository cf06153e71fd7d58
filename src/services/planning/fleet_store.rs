//! System of record for truck availability
//!
//! The planner re-reads availability at the start of every run and writes
//! consumed trucks back, so a later run does not book them again.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::TruckInfo;

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Current availability of a truck, `None` if the store does not know it
    async fn is_available(&self, truck_id: &str) -> Result<Option<bool>>;

    /// Persist that a truck has been booked
    async fn mark_unavailable(&self, truck_id: &str) -> Result<()>;
}

/// Availability kept in memory, used by the CLI and in tests
#[derive(Default)]
pub struct InMemoryFleetStore {
    availability: Mutex<HashMap<String, bool>>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a fleet listing
    pub fn with_trucks(trucks: &[TruckInfo]) -> Self {
        let availability = trucks
            .iter()
            .map(|t| (t.id.clone(), t.available))
            .collect();
        Self {
            availability: Mutex::new(availability),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.availability.lock().clone()
    }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn is_available(&self, truck_id: &str) -> Result<Option<bool>> {
        Ok(self.availability.lock().get(truck_id).copied())
    }

    async fn mark_unavailable(&self, truck_id: &str) -> Result<()> {
        self.availability.lock().insert(truck_id.to_string(), false);
        Ok(())
    }
}

/// Apply the store's availability flags to a fleet listing.
/// A truck stays available only if both the listing and the store agree.
pub async fn refresh_fleet(store: &dyn FleetStore, fleet: &[TruckInfo]) -> Vec<TruckInfo> {
    let mut refreshed = Vec::with_capacity(fleet.len());
    for truck in fleet {
        let mut truck = truck.clone();
        match store.is_available(&truck.id).await {
            Ok(Some(flag)) => truck.available = truck.available && flag,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Could not read availability of truck {}: {}", truck.id, e);
            }
        }
        refreshed.push(truck);
    }
    refreshed
}
