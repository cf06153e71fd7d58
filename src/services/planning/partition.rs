//! Grouping of parcels by pickup warehouse

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::Parcel;

/// Parcels split by warehouse
#[derive(Debug, Clone, Default)]
pub struct Partitioning {
    /// Warehouse id to its parcels in input order; never empty
    pub partitions: BTreeMap<i64, Vec<Parcel>>,
    /// Parcels without a usable warehouse id
    pub excluded: Vec<Parcel>,
}

impl Partitioning {
    pub fn parcel_count(&self) -> usize {
        self.partitions.values().map(Vec::len).sum::<usize>() + self.excluded.len()
    }
}

/// Split parcels by warehouse id.
///
/// Parcels whose warehouse id is missing, zero or negative are not planned
/// and are returned in `excluded` so the caller can report them.
pub fn partition_by_warehouse(parcels: &[Parcel]) -> Partitioning {
    let mut partitioning = Partitioning::default();

    for parcel in parcels {
        match parcel.valid_warehouse_id() {
            Some(warehouse_id) => partitioning
                .partitions
                .entry(warehouse_id)
                .or_default()
                .push(parcel.clone()),
            None => {
                warn!(
                    "Parcel {} has invalid warehouse id {:?}, excluded from planning",
                    parcel.id, parcel.warehouse_id
                );
                partitioning.excluded.push(parcel.clone());
            }
        }
    }

    partitioning
}
