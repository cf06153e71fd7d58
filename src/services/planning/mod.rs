//! Truck assignment and route construction
//!
//! Leaf first: bin packing and the solver strategy assign parcels, the pool
//! hands out trucks, the route builder and shift clustering shape each truck's
//! day, and the planner ties a run together.

pub mod aggregate;
pub mod bin_packer;
pub mod fleet_store;
pub mod partition;
pub mod planner;
pub mod pool;
pub mod pragmatic;
pub mod route_builder;
pub mod shift_cluster;
pub mod solver_config;
pub mod strategy;

pub use aggregate::{aggregate, verify_parcel_coverage, CoverageReport};
pub use bin_packer::{assign_best_fit, validate_inputs, BEST_FIT};
pub use fleet_store::{refresh_fleet, FleetStore, InMemoryFleetStore};
pub use partition::{partition_by_warehouse, Partitioning};
pub use planner::{FleetPlanner, PlannerConfig};
pub use pool::TruckPool;
pub use pragmatic::{PragmaticStrategy, PRAGMATIC};
pub use route_builder::{build_stops, measure_route, sequence_nearest_neighbor, RouteSequencing};
pub use shift_cluster::cluster_into_shifts;
pub use solver_config::SolverConfig;
pub use strategy::{create_strategy, AssignmentStrategy, BestFitStrategy, StrategyKind};
