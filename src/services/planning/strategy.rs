//! Assignment strategy abstraction
//!
//! The planner only sees [`AssignmentStrategy`]; which implementation runs is
//! a configuration choice.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::types::{AssignmentResult, Parcel, TruckInfo};

use super::bin_packer::{self, BEST_FIT};
use super::pragmatic::{PragmaticStrategy, PRAGMATIC};
use super::solver_config::SolverConfig;

/// Assigns one warehouse's parcels to candidate trucks
pub trait AssignmentStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Must never exceed a truck's capacity and must account for every parcel
    /// exactly once, either in an assignment or as unassigned.
    fn assign(&self, trucks: &[TruckInfo], parcels: &[Parcel]) -> Result<AssignmentResult, PlanningError>;
}

/// Greedy online best-fit
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFitStrategy;

impl AssignmentStrategy for BestFitStrategy {
    fn name(&self) -> &str {
        BEST_FIT
    }

    fn assign(&self, trucks: &[TruckInfo], parcels: &[Parcel]) -> Result<AssignmentResult, PlanningError> {
        bin_packer::assign_best_fit(trucks, parcels)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    BestFit,
    Pragmatic,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            BEST_FIT => Ok(Self::BestFit),
            PRAGMATIC => Ok(Self::Pragmatic),
            other => anyhow::bail!("unknown assignment strategy '{}'", other),
        }
    }
}

pub fn create_strategy(kind: StrategyKind, solver: SolverConfig) -> Arc<dyn AssignmentStrategy> {
    match kind {
        StrategyKind::BestFit => Arc::new(BestFitStrategy),
        StrategyKind::Pragmatic => Arc::new(PragmaticStrategy::new(solver)),
    }
}
