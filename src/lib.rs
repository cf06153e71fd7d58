//! Fleet Planner - truck-to-parcel assignment and route construction
//!
//! Parcels are grouped by pickup warehouse, packed onto trucks from a shared
//! pool so that no truck serves two warehouses in one run, and turned into
//! depot, warehouse and customer stops. Routes too long for one shift are
//! split into shift blocks.

pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod types;

pub use error::PlanningError;
pub use services::planning::{FleetPlanner, PlannerConfig};
