//! Merge per-warehouse results into one planning response

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use uuid::Uuid;

use crate::types::{Parcel, PlanningResponse, UndeliveredParcel, WarehousePlan};

/// Build the response for a run.
///
/// `excluded` holds parcels that never reached a partition. They come first
/// in the cross-warehouse undelivered list, followed by each warehouse's
/// undelivered parcels in warehouse order.
pub fn aggregate(
    warehouses: Vec<WarehousePlan>,
    excluded: Vec<UndeliveredParcel>,
    consumed_trucks: Vec<String>,
) -> PlanningResponse {
    let routes: Vec<_> = warehouses.iter().flat_map(|w| w.routes.iter().cloned()).collect();

    let mut undelivered = excluded;
    undelivered.extend(warehouses.iter().flat_map(|w| w.undelivered.iter().cloned()));

    let trucks_used = routes
        .iter()
        .map(|r| r.truck_id.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let total_distance_km = routes.iter().map(|r| r.total_distance_km).sum();
    let total_duration_minutes = routes.iter().map(|r| r.total_duration_minutes).sum();

    PlanningResponse {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        trucks_used,
        total_distance_km,
        total_duration_minutes,
        warehouses,
        routes,
        undelivered,
        consumed_trucks,
    }
}

/// Parcels that are missing from a response or appear more than once
#[derive(Debug, Default, PartialEq)]
pub struct CoverageReport {
    pub missing: Vec<String>,
    pub duplicated: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty()
    }
}

/// Check that every input parcel appears exactly once, either on a route
/// stop or in the undelivered list.
pub fn verify_parcel_coverage(parcels: &[Parcel], response: &PlanningResponse) -> CoverageReport {
    let mut expected: HashMap<&str, usize> = HashMap::new();
    for parcel in parcels {
        *expected.entry(parcel.id.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let on_routes = response
        .routes
        .iter()
        .flat_map(|r| r.stops.iter())
        .flat_map(|s| s.parcels.iter())
        .map(|p| p.id.as_str());
    let undelivered = response.undelivered.iter().map(|u| u.parcel_id.as_str());
    for id in on_routes.chain(undelivered) {
        *seen.entry(id).or_default() += 1;
    }

    let mut report = CoverageReport::default();
    for (id, count) in &expected {
        let found = seen.get(id).copied().unwrap_or(0);
        if found < *count {
            report.missing.push(id.to_string());
        } else if found > *count {
            report.duplicated.push(id.to_string());
        }
    }
    for id in seen.keys() {
        if !expected.contains_key(id) {
            report.duplicated.push(id.to_string());
        }
    }

    report.missing.sort();
    report.duplicated.sort();
    report
}
