//! Shared truck pool for one planning run
//!
//! The pool is the only state shared between warehouse partitions. A
//! partition reads its candidates, assigns and marks the used trucks inside
//! one [`TruckPool::checkout`] call, so two partitions can never both see a
//! truck as available.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::PlanningError;
use crate::types::{AssignmentResult, TruckInfo};

struct PoolState {
    /// Fleet in input order, availability updated in place
    trucks: Vec<TruckInfo>,
    /// Truck ids consumed during this run, in consumption order
    consumed: Vec<String>,
}

impl PoolState {
    fn position(&self, truck_id: &str) -> Option<usize> {
        self.trucks.iter().position(|t| t.id == truck_id)
    }

    fn mark(&mut self, index: usize) -> TruckInfo {
        let truck = &mut self.trucks[index];
        if truck.available {
            truck.available = false;
            self.consumed.push(truck.id.clone());
        }
        truck.clone()
    }
}

/// Thread-safe pool of trucks, cheap to clone
#[derive(Clone)]
pub struct TruckPool {
    state: Arc<Mutex<PoolState>>,
}

impl TruckPool {
    /// Build the pool from a freshly read fleet. Duplicate ids keep the first entry.
    pub fn from_fleet(fleet: Vec<TruckInfo>) -> Self {
        let mut seen = HashSet::new();
        let mut trucks = Vec::with_capacity(fleet.len());
        for truck in fleet {
            if seen.insert(truck.id.clone()) {
                trucks.push(truck);
            } else {
                warn!("Duplicate truck id {} ignored", truck.id);
            }
        }

        Self {
            state: Arc::new(Mutex::new(PoolState {
                trucks,
                consumed: Vec::new(),
            })),
        }
    }

    /// Trucks still available, in fleet order
    pub fn available_trucks(&self) -> Vec<TruckInfo> {
        self.state
            .lock()
            .trucks
            .iter()
            .filter(|t| t.available)
            .cloned()
            .collect()
    }

    /// Mark a truck as used for the rest of the run
    pub fn mark_unavailable(&self, truck_id: &str) -> Result<TruckInfo, PlanningError> {
        let mut state = self.state.lock();
        let index = state
            .position(truck_id)
            .ok_or_else(|| PlanningError::TruckNotFound(truck_id.to_string()))?;
        Ok(state.mark(index))
    }

    /// Hand a truck consumed in this run back to the pool. Trucks that were
    /// already unavailable when the run started stay unavailable.
    pub fn release(&self, truck_id: &str) -> Result<bool, PlanningError> {
        let mut state = self.state.lock();
        let index = state
            .position(truck_id)
            .ok_or_else(|| PlanningError::TruckNotFound(truck_id.to_string()))?;

        let Some(slot) = state.consumed.iter().position(|id| id == truck_id) else {
            return Ok(false);
        };
        state.consumed.remove(slot);
        state.trucks[index].available = true;
        debug!("Truck {} released", truck_id);
        Ok(true)
    }

    /// Read candidates, run `assign` on them and mark every truck that
    /// received a parcel, all under one lock.
    ///
    /// If the result names a truck that was not a candidate, nothing is
    /// marked and the assignment is discarded.
    pub fn checkout<F>(&self, assign: F) -> Result<AssignmentResult, PlanningError>
    where
        F: FnOnce(&[TruckInfo]) -> Result<AssignmentResult, PlanningError>,
    {
        let mut state = self.state.lock();

        let candidates: Vec<TruckInfo> = state.trucks.iter().filter(|t| t.available).cloned().collect();
        let result = assign(&candidates)?;

        let mut indices = Vec::with_capacity(result.assignments.len());
        for assignment in result.assignments.iter().filter(|a| !a.parcels.is_empty()) {
            if !candidates.iter().any(|c| c.id == assignment.truck_id) {
                warn!(
                    "Assignment names truck {} which is not in the pool; discarding partition result",
                    assignment.truck_id
                );
                return Err(PlanningError::TruckNotFound(assignment.truck_id.clone()));
            }
            // Candidates come from `state.trucks`, so the id resolves
            if let Some(index) = state.position(&assignment.truck_id) {
                indices.push(index);
            }
        }

        for index in indices {
            let truck = state.mark(index);
            debug!("Truck {} checked out", truck.id);
        }

        Ok(result)
    }

    /// Ids of trucks consumed so far in this run
    pub fn consumed(&self) -> Vec<String> {
        self.state.lock().consumed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::planning::bin_packer::assign_best_fit;
    use crate::types::{Coordinates, Parcel, TruckAssignment};

    fn parcel(id: &str, volume: f64) -> Parcel {
        Parcel {
            id: id.to_string(),
            name: id.to_string(),
            volume,
            warehouse_id: Some(1),
            pickup: Coordinates::new(50.0, 14.0),
            delivery: Coordinates::new(50.1, 14.1),
            recipient: Default::default(),
        }
    }

    fn pool() -> TruckPool {
        TruckPool::from_fleet(vec![
            TruckInfo::new("T1", 50.0),
            TruckInfo::new("T2", 100.0),
            TruckInfo::new("T3", 80.0),
        ])
    }

    fn ids(trucks: &[TruckInfo]) -> Vec<&str> {
        trucks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_available_trucks_skips_unavailable() {
        let mut parked = TruckInfo::new("T9", 10.0);
        parked.available = false;
        let pool = TruckPool::from_fleet(vec![TruckInfo::new("T1", 10.0), parked]);

        assert_eq!(ids(&pool.available_trucks()), vec!["T1"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let pool = TruckPool::from_fleet(vec![TruckInfo::new("T1", 10.0), TruckInfo::new("T1", 99.0)]);
        let trucks = pool.available_trucks();
        assert_eq!(trucks.len(), 1);
        assert_eq!(trucks[0].capacity, 10.0);
    }

    #[test]
    fn test_mark_unavailable() {
        let pool = pool();
        let truck = pool.mark_unavailable("T2").unwrap();

        assert!(!truck.available);
        assert_eq!(ids(&pool.available_trucks()), vec!["T1", "T3"]);
        assert_eq!(pool.consumed(), vec!["T2".to_string()]);
    }

    #[test]
    fn test_mark_unavailable_twice_consumes_once() {
        let pool = pool();
        pool.mark_unavailable("T1").unwrap();
        pool.mark_unavailable("T1").unwrap();
        assert_eq!(pool.consumed(), vec!["T1".to_string()]);
    }

    #[test]
    fn test_mark_unknown_truck_is_not_found() {
        let err = pool().mark_unavailable("NOPE").unwrap_err();
        assert_eq!(err, PlanningError::TruckNotFound("NOPE".to_string()));
        assert_eq!(err.code(), "TRUCK_NOT_FOUND");
    }

    #[test]
    fn test_release_returns_consumed_truck() {
        let pool = pool();
        pool.mark_unavailable("T1").unwrap();
        pool.mark_unavailable("T2").unwrap();

        assert!(pool.release("T1").unwrap());
        assert_eq!(ids(&pool.available_trucks()), vec!["T1", "T3"]);
        assert_eq!(pool.consumed(), vec!["T2".to_string()]);
    }

    #[test]
    fn test_release_keeps_trucks_parked_before_the_run() {
        let mut parked = TruckInfo::new("T9", 10.0);
        parked.available = false;
        let pool = TruckPool::from_fleet(vec![parked]);

        assert!(!pool.release("T9").unwrap());
        assert!(pool.available_trucks().is_empty());
        assert_eq!(pool.release("NOPE").unwrap_err().code(), "TRUCK_NOT_FOUND");
    }

    #[test]
    fn test_checkout_marks_only_used_trucks() {
        let pool = pool();
        let result = pool
            .checkout(|candidates| assign_best_fit(candidates, &[parcel("A", 45.0)]))
            .unwrap();

        assert_eq!(result.used_truck_ids(), vec!["T1".to_string()]);
        assert_eq!(ids(&pool.available_trucks()), vec!["T2", "T3"]);
    }

    #[test]
    fn test_second_checkout_never_sees_used_trucks() {
        let pool = pool();
        let first = pool
            .checkout(|candidates| assign_best_fit(candidates, &[parcel("A", 45.0), parcel("B", 90.0)]))
            .unwrap();
        let second = pool
            .checkout(|candidates| {
                assert_eq!(ids(candidates), vec!["T3"]);
                assign_best_fit(candidates, &[parcel("C", 10.0)])
            })
            .unwrap();

        let first_ids: HashSet<String> = first.used_truck_ids().into_iter().collect();
        for id in second.used_truck_ids() {
            assert!(!first_ids.contains(&id));
        }
        assert!(pool.available_trucks().is_empty());
    }

    #[test]
    fn test_checkout_error_marks_nothing() {
        let pool = pool();
        let err = pool
            .checkout(|candidates| assign_best_fit(candidates, &[parcel("BAD", -1.0)]))
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_PARCEL_VOLUME");
        assert_eq!(pool.available_trucks().len(), 3);
    }

    #[test]
    fn test_checkout_unknown_truck_discards_assignment() {
        let pool = pool();
        let err = pool
            .checkout(|_| {
                let loads = vec![
                    TruckAssignment {
                        truck_id: "T1".to_string(),
                        truck_name: "T1".to_string(),
                        parcels: vec![parcel("A", 1.0)],
                        used_volume: 1.0,
                        capacity: 50.0,
                    },
                    TruckAssignment {
                        truck_id: "GHOST".to_string(),
                        truck_name: "GHOST".to_string(),
                        parcels: vec![parcel("B", 1.0)],
                        used_volume: 1.0,
                        capacity: 50.0,
                    },
                ];
                Ok(AssignmentResult::new(loads, vec![], "test"))
            })
            .unwrap_err();

        assert_eq!(err, PlanningError::TruckNotFound("GHOST".to_string()));
        // T1 preceded the bad entry but must stay available
        assert_eq!(pool.available_trucks().len(), 3);
        assert!(pool.consumed().is_empty());
    }

    #[test]
    fn test_checkout_with_exhausted_pool_reports_no_trucks() {
        let pool = TruckPool::from_fleet(vec![TruckInfo::new("T1", 10.0)]);
        pool.mark_unavailable("T1").unwrap();

        let err = pool
            .checkout(|candidates| assign_best_fit(candidates, &[parcel("A", 1.0)]))
            .unwrap_err();
        assert_eq!(err, PlanningError::NoTrucks);
    }

    #[test]
    fn test_concurrent_checkouts_never_share_a_truck() {
        let fleet: Vec<TruckInfo> = (0..8).map(|i| TruckInfo::new(format!("T{}", i), 10.0)).collect();
        let pool = TruckPool::from_fleet(fleet);

        let handles: Vec<_> = (0..8)
            .map(|w| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    pool.checkout(|candidates| {
                        assign_best_fit(candidates, &[parcel(&format!("W{}", w), 6.0)])
                    })
                })
            })
            .collect();

        let mut used = Vec::new();
        for handle in handles {
            if let Ok(result) = handle.join().unwrap() {
                used.extend(result.used_truck_ids());
            }
        }

        let unique: HashSet<&String> = used.iter().collect();
        assert_eq!(used.len(), 8);
        assert_eq!(unique.len(), used.len());
    }
}
