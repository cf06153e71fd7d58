//! Constraint solver configuration

use chrono::NaiveDate;

/// Configuration for the vrp-pragmatic assignment strategy
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solving time in seconds
    pub max_time_seconds: u32,
    /// Maximum generations for metaheuristic
    pub max_generations: usize,
    /// Day the shifts are anchored to; only relative times matter
    pub date: NaiveDate,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_time_seconds: 30,
            max_generations: 3000,
            date: default_date(),
        }
    }
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid static planning date")
}

impl SolverConfig {
    /// Create config with custom values
    pub fn new(max_time_seconds: u32, max_generations: usize) -> Self {
        Self {
            max_time_seconds,
            max_generations,
            ..Default::default()
        }
    }

    /// Fast configuration for interactive use
    pub fn fast() -> Self {
        Self::new(5, 500)
    }

    /// Quality configuration for background processing
    pub fn quality() -> Self {
        Self::new(60, 10000)
    }

    /// Minimal solve time, may not find the best packing
    pub fn instant() -> Self {
        Self::new(2, 200)
    }
}
