//! Assignment through the vrp-pragmatic constraint solver.
//!
//! Each truck becomes one vehicle starting at the warehouse with an open
//! tour, each parcel one delivery job. Volumes are scaled to integer units
//! for the solver, so every tour is re-checked against the real volumes
//! before it is accepted.

use std::collections::{HashMap, HashSet};
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use vrp_cli::extensions::solve::config::{create_builder_from_config, Config, TerminationConfig};
use vrp_core::solver::Solver;
use vrp_pragmatic::format::problem::{Matrix, PragmaticProblem, Problem};
use vrp_pragmatic::format::solution::{write_pragmatic, PragmaticOutputType, Solution as PragmaticSolution};

use crate::error::PlanningError;
use crate::services::geo;
use crate::types::{AssignmentResult, Coordinates, Parcel, TruckAssignment, TruckInfo, UnassignedParcel};

use super::bin_packer::{assign_best_fit, validate_inputs};
use super::solver_config::SolverConfig;
use super::strategy::AssignmentStrategy;

pub const PRAGMATIC: &str = "pragmatic";

const PROFILE: &str = "truck";

/// Integer units per volume unit
const VOLUME_SCALE: f64 = 1000.0;

/// Per-vehicle cost that makes the solver prefer fewer trucks
const VEHICLE_FIXED_COST: f64 = 1000.0;

pub struct PragmaticStrategy {
    config: SolverConfig,
    /// Run best-fit when the solver fails instead of failing the partition
    fallback_to_best_fit: bool,
}

impl PragmaticStrategy {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            fallback_to_best_fit: true,
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback_to_best_fit = false;
        self
    }
}

impl AssignmentStrategy for PragmaticStrategy {
    fn name(&self) -> &str {
        PRAGMATIC
    }

    fn assign(&self, trucks: &[TruckInfo], parcels: &[Parcel]) -> Result<AssignmentResult, PlanningError> {
        validate_inputs(trucks, parcels)?;

        let started_at = std::time::Instant::now();
        match solve_pragmatic(trucks, parcels, &self.config) {
            Ok(result) => {
                info!(
                    "vrp-pragmatic assigned {} parcels to {} trucks in {} ms, {} unassigned",
                    result.assigned_parcel_count(),
                    result.assignments.len(),
                    started_at.elapsed().as_millis(),
                    result.unassigned.len()
                );
                Ok(result)
            }
            Err(e) if self.fallback_to_best_fit => {
                warn!("vrp-pragmatic failed: {:#}. Falling back to best-fit.", e);
                assign_best_fit(trucks, parcels)
            }
            Err(e) => Err(PlanningError::Solver(format!("{:#}", e))),
        }
    }
}

fn volume_units(volume: f64) -> i64 {
    ((volume * VOLUME_SCALE).ceil() as i64).clamp(1, i64::from(i32::MAX))
}

fn capacity_units(capacity: f64) -> i64 {
    ((capacity * VOLUME_SCALE).floor() as i64).clamp(0, i64::from(i32::MAX))
}

/// Location 0 is the warehouse, location `i + 1` is the delivery of parcel `i`
fn locations(parcels: &[Parcel]) -> Vec<Coordinates> {
    let warehouse = parcels.first().map(|p| p.pickup);
    warehouse
        .into_iter()
        .chain(parcels.iter().map(|p| p.delivery))
        .collect()
}

fn build_pragmatic_problem(trucks: &[TruckInfo], parcels: &[Parcel], config: &SolverConfig) -> Value {
    let jobs: Vec<Value> = parcels
        .iter()
        .enumerate()
        .map(|(index, parcel)| {
            json!({
                "id": parcel.id,
                "deliveries": [{
                    "places": [{
                        "location": { "index": index + 1 },
                        "duration": 0
                    }],
                    "demand": [volume_units(parcel.volume)]
                }]
            })
        })
        .collect();

    let start = DateTime::<Utc>::from_naive_utc_and_offset(
        NaiveDateTime::new(config.date, NaiveTime::default()),
        Utc,
    )
    .to_rfc3339_opts(SecondsFormat::Secs, true);

    let vehicles: Vec<Value> = trucks
        .iter()
        .map(|truck| {
            json!({
                "typeId": truck.id,
                "vehicleIds": [truck.id],
                "profile": { "matrix": PROFILE },
                "costs": {
                    "fixed": VEHICLE_FIXED_COST,
                    "distance": 1.0,
                    "time": 1.0
                },
                "shifts": [{
                    "start": {
                        "earliest": start,
                        "location": { "index": 0 }
                    }
                }],
                "capacity": [capacity_units(truck.capacity)]
            })
        })
        .collect();

    json!({
        "plan": { "jobs": jobs },
        "fleet": {
            "vehicles": vehicles,
            "profiles": [{ "name": PROFILE }]
        }
    })
}

/// Great-circle matrix in meters and seconds
fn build_pragmatic_matrix(points: &[Coordinates]) -> Matrix {
    let km = geo::distance_matrix(points, 1.0);
    let size = points.len();
    let mut travel_times = Vec::with_capacity(size * size);
    let mut distances = Vec::with_capacity(size * size);

    for row in &km {
        for d in row {
            distances.push((d * 1000.0).round() as i64);
            travel_times.push((geo::travel_minutes(*d, geo::AVERAGE_SPEED_KMH) * 60.0).round() as i64);
        }
    }

    Matrix {
        profile: Some(PROFILE.to_string()),
        timestamp: None,
        travel_times,
        distances,
        error_codes: None,
    }
}

fn solve_pragmatic(trucks: &[TruckInfo], parcels: &[Parcel], config: &SolverConfig) -> Result<AssignmentResult> {
    let problem_json = build_pragmatic_problem(trucks, parcels, config);
    let problem_format: Problem =
        serde_json::from_value(problem_json).context("Failed to deserialize pragmatic problem")?;

    let matrix = build_pragmatic_matrix(&locations(parcels));
    let core_problem = (problem_format, vec![matrix])
        .read_pragmatic()
        .context("Failed to build core problem from pragmatic format")?;

    let core_problem = Arc::new(core_problem);
    let solver_config = build_solver_config(core_problem.clone(), config)?;

    let solution = Solver::new(core_problem.clone(), solver_config)
        .solve()
        .context("Failed to solve assignment with vrp-pragmatic")?;

    let pragmatic = write_pragmatic_solution(core_problem.as_ref(), &solution)?;
    Ok(collect_loads(trucks, parcels, &tour_jobs(&pragmatic)))
}

fn build_solver_config(
    problem: Arc<vrp_core::models::Problem>,
    config: &SolverConfig,
) -> Result<vrp_core::rosomaxa::evolution::EvolutionConfig<
    vrp_core::solver::RefinementContext,
    vrp_core::models::GoalContext,
    vrp_core::construction::heuristics::InsertionContext,
>> {
    let config = Config {
        termination: Some(TerminationConfig {
            max_time: Some(config.max_time_seconds as usize),
            max_generations: Some(config.max_generations),
            variation: None,
        }),
        evolution: None,
        hyper: None,
        environment: None,
        telemetry: None,
        output: None,
    };

    let builder = create_builder_from_config(problem, Vec::new(), &config)
        .context("Failed to create solver builder")?;

    builder.build().context("Failed to build solver configuration")
}

fn write_pragmatic_solution(
    problem: &vrp_core::models::Problem,
    solution: &vrp_core::models::Solution,
) -> Result<PragmaticSolution> {
    let mut writer = BufWriter::new(Vec::new());
    write_pragmatic(problem, solution, PragmaticOutputType::default(), &mut writer)
        .context("Failed to serialize pragmatic solution")?;

    let bytes = writer.into_inner().context("Failed to flush solution writer")?;
    serde_json::from_slice(&bytes).context("Failed to parse pragmatic solution JSON")
}

/// Job ids per vehicle, in visit order
fn tour_jobs(solution: &PragmaticSolution) -> Vec<(String, Vec<String>)> {
    solution
        .tours
        .iter()
        .map(|tour| {
            let jobs = tour
                .stops
                .iter()
                .flat_map(|stop| stop.activities())
                .filter(|a| a.activity_type != "departure" && a.activity_type != "arrival")
                .map(|a| a.job_id.clone())
                .collect();
            (tour.vehicle_id.clone(), jobs)
        })
        .collect()
}

/// Turn solver tours into truck loads.
///
/// Tours are kept in fleet order. A delivery that would push a truck past its
/// real capacity is moved to unassigned, as is any parcel the solution does
/// not mention.
fn collect_loads(
    trucks: &[TruckInfo],
    parcels: &[Parcel],
    tours: &[(String, Vec<String>)],
) -> AssignmentResult {
    let parcel_by_id: HashMap<&str, &Parcel> = parcels.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut loads = Vec::new();

    for truck in trucks {
        let Some((_, jobs)) = tours.iter().find(|(vehicle_id, _)| *vehicle_id == truck.id) else {
            continue;
        };

        let mut load = TruckAssignment {
            truck_id: truck.id.clone(),
            truck_name: truck.name.clone(),
            parcels: Vec::new(),
            used_volume: 0.0,
            capacity: truck.capacity,
        };

        for job_id in jobs {
            let Some(parcel) = parcel_by_id.get(job_id.as_str()).copied() else {
                warn!("Solver returned unknown job {}", job_id);
                continue;
            };
            if placed.contains(parcel.id.as_str()) {
                continue;
            }
            if load.used_volume + parcel.volume > load.capacity {
                debug!(
                    "Parcel {} exceeds real capacity of truck {}, left unassigned",
                    parcel.id, truck.id
                );
                continue;
            }
            load.used_volume += parcel.volume;
            load.parcels.push(parcel.clone());
            placed.insert(parcel.id.as_str());
        }

        if !load.parcels.is_empty() {
            loads.push(load);
        }
    }

    let unassigned = parcels
        .iter()
        .filter(|p| !placed.contains(p.id.as_str()))
        .map(|p| UnassignedParcel {
            parcel_id: p.id.clone(),
            volume: p.volume,
        })
        .collect();

    AssignmentResult::new(loads, unassigned, PRAGMATIC)
}
