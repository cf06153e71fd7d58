//! Online best-fit assignment of parcels to trucks
//!
//! Parcels are placed in the order given. Each one goes to the truck that
//! would have the least room left after taking it. Trucks are scanned in
//! bin-packing order: trucks already carrying parcels in the order they were
//! first loaded, then untouched trucks in input order. The first truck seen
//! with the smallest waste wins. Capacities and volumes are compared exactly.

use tracing::debug;

use crate::error::PlanningError;
use crate::types::{AssignmentResult, Parcel, TruckAssignment, TruckInfo, UnassignedParcel};

pub const BEST_FIT: &str = "best_fit";

/// Reject inputs no strategy can work with
pub fn validate_inputs(trucks: &[TruckInfo], parcels: &[Parcel]) -> Result<(), PlanningError> {
    if trucks.is_empty() {
        return Err(PlanningError::NoTrucks);
    }
    if parcels.is_empty() {
        return Err(PlanningError::NoParcels);
    }

    if let Some(truck) = trucks.iter().find(|t| !(t.capacity > 0.0) || !t.capacity.is_finite()) {
        return Err(PlanningError::InvalidCapacity {
            truck_id: truck.id.clone(),
            capacity: truck.capacity,
        });
    }

    if let Some(parcel) = parcels.iter().find(|p| !(p.volume > 0.0) || !p.volume.is_finite()) {
        return Err(PlanningError::InvalidVolume {
            parcel_id: parcel.id.clone(),
            volume: parcel.volume,
        });
    }

    Ok(())
}

/// Assign parcels to trucks with the online best-fit rule
pub fn assign_best_fit(
    trucks: &[TruckInfo],
    parcels: &[Parcel],
) -> Result<AssignmentResult, PlanningError> {
    validate_inputs(trucks, parcels)?;

    let mut loads: Vec<TruckAssignment> = trucks
        .iter()
        .map(|truck| TruckAssignment {
            truck_id: truck.id.clone(),
            truck_name: truck.name.clone(),
            parcels: Vec::new(),
            used_volume: 0.0,
            capacity: truck.capacity,
        })
        .collect();
    let mut unassigned = Vec::new();
    let mut opened: Vec<usize> = Vec::new();

    for parcel in parcels {
        let scan_order = opened
            .iter()
            .copied()
            .chain((0..loads.len()).filter(|i| loads[*i].parcels.is_empty()));

        match best_fit_index(&loads, scan_order, parcel.volume) {
            Some(index) => {
                if loads[index].parcels.is_empty() {
                    opened.push(index);
                }
                let load = &mut loads[index];
                load.used_volume += parcel.volume;
                load.parcels.push(parcel.clone());
            }
            None => {
                debug!("Parcel {} ({}) does not fit any truck", parcel.id, parcel.volume);
                unassigned.push(UnassignedParcel {
                    parcel_id: parcel.id.clone(),
                    volume: parcel.volume,
                });
            }
        }
    }

    loads.retain(|load| !load.parcels.is_empty());

    Ok(AssignmentResult::new(loads, unassigned, BEST_FIT))
}

/// Index of the truck with the smallest remaining capacity after placing `volume`
fn best_fit_index(
    loads: &[TruckAssignment],
    scan_order: impl Iterator<Item = usize>,
    volume: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for index in scan_order {
        let load = &loads[index];
        // Compare the would-be load, not `remaining >= volume`, so the stored
        // sum can never round past the capacity
        let loaded = load.used_volume + volume;
        if loaded > load.capacity {
            continue;
        }
        let waste = load.capacity - loaded;
        match best {
            Some((_, best_waste)) if waste >= best_waste => {}
            _ => best = Some((index, waste)),
        }
    }

    best.map(|(index, _)| index)
}
