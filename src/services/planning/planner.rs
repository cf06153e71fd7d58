//! Planning run orchestration
//!
//! One run: re-read truck availability, partition parcels by warehouse, and
//! for each warehouse check trucks out of the shared pool, build their routes
//! and collect what could not be delivered. A failing warehouse is reported
//! as FAILED and never aborts its siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::defaults;
use crate::error::PlanningError;
use crate::services::routing::{DistanceTimeMatrices, MatrixProvider};
use crate::types::{
    AssignmentResult, Coordinates, Parcel, PlanStatus, PlanningRequest, PlanningResponse, ShiftBlock,
    Stop, StopKind, TruckAssignment, TruckRoute, UndeliveredParcel, UndeliveredReason, WarehousePlan,
};

use super::aggregate::{aggregate, verify_parcel_coverage};
use super::fleet_store::{refresh_fleet, FleetStore};
use super::partition::partition_by_warehouse;
use super::pool::TruckPool;
use super::route_builder::{
    build_stops, measure_route, sequence_nearest_neighbor, stop_coordinates, submatrix,
    warehouse_location, RouteSequencing, WAREHOUSE_INDEX,
};
use super::shift_cluster::cluster_into_shifts;
use super::strategy::AssignmentStrategy;

/// Engine-level settings for a planning run
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Split over-long routes into shift blocks
    pub shift_clustering: bool,
    /// Workload (travel plus service) above which a route is split into
    /// `shift_blocks`. The default 540 minutes is one 08:00-17:00 day, while
    /// the default blocks absorb only 460 minutes, so a route just over the
    /// threshold loses its farthest deliveries.
    pub shift_minutes: f64,
    pub shift_blocks: Vec<ShiftBlock>,
    /// Average time spent at each customer stop
    pub service_minutes: f64,
    pub average_speed_kmh: f64,
    pub sequencing: RouteSequencing,
    /// Process warehouses concurrently instead of in warehouse id order
    pub parallel_partitions: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            shift_clustering: true,
            shift_minutes: defaults::default_shift_minutes(),
            shift_blocks: defaults::default_shift_blocks(),
            service_minutes: defaults::DEFAULT_SERVICE_MINUTES,
            average_speed_kmh: crate::services::geo::AVERAGE_SPEED_KMH,
            sequencing: RouteSequencing::default(),
            parallel_partitions: false,
        }
    }
}

/// Shared state of one planning run
struct RunContext<'a> {
    depot: Coordinates,
    request: &'a PlanningRequest,
    pool: &'a TruckPool,
    cancel: &'a CancellationToken,
}

pub struct FleetPlanner {
    matrix_provider: MatrixProvider,
    strategy: Arc<dyn AssignmentStrategy>,
    fleet_store: Arc<dyn FleetStore>,
    config: PlannerConfig,
}

impl FleetPlanner {
    pub fn new(
        matrix_provider: MatrixProvider,
        strategy: Arc<dyn AssignmentStrategy>,
        fleet_store: Arc<dyn FleetStore>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            matrix_provider,
            strategy,
            fleet_store,
            config,
        }
    }

    pub async fn plan(&self, request: &PlanningRequest) -> PlanningResponse {
        self.plan_with_cancellation(request, &CancellationToken::new()).await
    }

    /// Run the planner. Cancelling `cancel` abandons outstanding routing
    /// service calls; the affected routes are measured with the fallback.
    pub async fn plan_with_cancellation(
        &self,
        request: &PlanningRequest,
        cancel: &CancellationToken,
    ) -> PlanningResponse {
        let started_at = Instant::now();
        info!(
            "Planning run for depot {}: {} parcels, {} trucks, strategy {}",
            request.depot.id,
            request.parcels.len(),
            request.depot.trucks.len(),
            self.strategy.name()
        );

        let fleet = refresh_fleet(self.fleet_store.as_ref(), &request.depot.trucks).await;
        let pool = TruckPool::from_fleet(fleet);
        debug!("{} trucks available at start of run", pool.available_trucks().len());

        let partitioning = partition_by_warehouse(&request.parcels);
        debug!(
            "{} parcels in {} warehouse partitions, {} excluded",
            partitioning.parcel_count(),
            partitioning.partitions.len(),
            partitioning.excluded.len()
        );
        let excluded: Vec<UndeliveredParcel> = partitioning
            .excluded
            .iter()
            .map(|p| {
                UndeliveredParcel::new(p, UndeliveredReason::InvalidWarehouse)
                    .with_detail("missing or non-positive warehouse id")
            })
            .collect();

        let ctx = RunContext {
            depot: request.depot.coordinates,
            request,
            pool: &pool,
            cancel,
        };

        let plans = if self.config.parallel_partitions {
            let tasks = partitioning
                .partitions
                .into_iter()
                .map(|(warehouse_id, parcels)| self.plan_warehouse(&ctx, warehouse_id, parcels));
            join_all(tasks).await
        } else {
            let mut plans = Vec::with_capacity(partitioning.partitions.len());
            for (warehouse_id, parcels) in partitioning.partitions {
                plans.push(self.plan_warehouse(&ctx, warehouse_id, parcels).await);
            }
            plans
        };

        let response = aggregate(plans, excluded, pool.consumed());

        let coverage = verify_parcel_coverage(&request.parcels, &response);
        if coverage.is_complete() {
            debug!("All {} parcels accounted for", request.parcels.len());
        } else {
            error!(
                "Parcel coverage broken: missing {:?}, duplicated {:?}",
                coverage.missing, coverage.duplicated
            );
        }

        info!(
            "Planning run {} done in {} ms: {} trucks, {:.1} km, {} undelivered",
            response.id,
            started_at.elapsed().as_millis(),
            response.trucks_used,
            response.total_distance_km,
            response.undelivered.len()
        );

        response
    }

    async fn plan_warehouse(&self, ctx: &RunContext<'_>, warehouse_id: i64, parcels: Vec<Parcel>) -> WarehousePlan {
        debug!("Warehouse {}: assigning {} parcels", warehouse_id, parcels.len());

        let mut assignment = match self.checkout(ctx.pool, parcels.clone()).await {
            Ok(assignment) => assignment,
            Err(e) => {
                if e.is_validation() {
                    warn!("Warehouse {} rejected: {}", warehouse_id, e);
                } else {
                    error!("Warehouse {} failed: {}", warehouse_id, e);
                }
                return failed_plan(warehouse_id, &parcels, &e);
            }
        };

        let mut undelivered: Vec<UndeliveredParcel> = assignment
            .unassigned
            .iter()
            .map(|u| UndeliveredParcel {
                parcel_id: u.parcel_id.clone(),
                volume: u.volume,
                warehouse_id: Some(warehouse_id),
                reason: UndeliveredReason::NoTruckCapacity,
                detail: None,
            })
            .collect();

        let known = ctx.request.warehouse(warehouse_id).map(|w| w.coordinates);
        let mut routes = Vec::with_capacity(assignment.assignments.len());
        let mut dropped = Vec::new();
        for load in &assignment.assignments {
            let (route, removed) = self.build_route(ctx, warehouse_id, known, load).await;
            match route {
                Some(route) => routes.push(route),
                None => self.release_truck(ctx.pool, &load.truck_id),
            }
            dropped.extend(removed);
        }

        if !dropped.is_empty() {
            let dropped_ids: HashSet<String> = dropped.iter().map(|u| u.parcel_id.clone()).collect();
            assignment = assignment.without_parcels(&dropped_ids);
            undelivered.extend(dropped);
        }

        self.persist_consumed(&assignment).await;

        info!(
            "Warehouse {}: {} trucks, {} parcels routed, {} undelivered, {:.1}% utilization",
            warehouse_id,
            routes.len(),
            routes.iter().map(TruckRoute::parcel_count).sum::<usize>(),
            undelivered.len(),
            assignment.utilization_percent
        );

        WarehousePlan {
            warehouse_id,
            status: PlanStatus::Success,
            assignment: Some(assignment),
            routes,
            undelivered,
            error: None,
        }
    }

    /// Assign on the blocking pool while holding the truck pool checkout
    async fn checkout(&self, pool: &TruckPool, parcels: Vec<Parcel>) -> Result<AssignmentResult, PlanningError> {
        let pool = pool.clone();
        let strategy = self.strategy.clone();

        tokio::task::spawn_blocking(move || pool.checkout(|candidates| strategy.assign(candidates, &parcels)))
            .await
            .map_err(|e| PlanningError::Internal(format!("assignment task failed: {}", e)))?
    }

    /// Write consumed trucks back so later runs do not book them again
    async fn persist_consumed(&self, assignment: &AssignmentResult) {
        for truck_id in assignment.used_truck_ids() {
            if let Err(e) = self.fleet_store.mark_unavailable(&truck_id).await {
                warn!("Failed to persist availability of truck {}: {}", truck_id, e);
            }
        }
    }

    /// Return a truck whose deliveries all fell out of its shifts
    fn release_truck(&self, pool: &TruckPool, truck_id: &str) {
        match pool.release(truck_id) {
            Ok(true) => info!("Truck {} has no deliverable stops; released", truck_id),
            Ok(false) => {}
            Err(e) => warn!("Failed to release truck {}: {}", truck_id, e),
        }
    }

    /// Build and measure one truck's route. `None` when shift clustering
    /// leaves no customer stop; the truck's parcels are then all in the
    /// returned undelivered list.
    async fn build_route(
        &self,
        ctx: &RunContext<'_>,
        warehouse_id: i64,
        known_warehouse: Option<Coordinates>,
        load: &TruckAssignment,
    ) -> (Option<TruckRoute>, Vec<UndeliveredParcel>) {
        let warehouse = warehouse_location(known_warehouse, load).unwrap_or(ctx.depot);
        let mut stops = build_stops(load, ctx.depot, warehouse);

        let (mut matrices, matrix_source) = self
            .matrix_provider
            .get_matrices_cancellable(&stop_coordinates(&stops), &ctx.cancel.child_token())
            .await;

        if self.config.sequencing == RouteSequencing::NearestNeighbor {
            matrices = sequence_nearest_neighbor(&mut stops, &matrices);
        }

        let (mut distance_km, mut duration_minutes) = measure_route(&stops, &matrices);
        let mut shifts = None;
        let mut dropped = Vec::new();

        let customers = stops.len().saturating_sub(WAREHOUSE_INDEX + 1);
        let workload = duration_minutes + self.config.service_minutes * customers as f64;
        if self.config.shift_clustering && workload > self.config.shift_minutes {
            debug!(
                "Truck {} needs {:.0} minutes, more than one {:.0} minute shift; clustering",
                load.truck_id, workload, self.config.shift_minutes
            );

            let deliveries: Vec<(Coordinates, f64)> = (WAREHOUSE_INDEX + 1..stops.len())
                .map(|i| (stops[i].coordinates, matrices.distance(WAREHOUSE_INDEX, i)))
                .collect();
            let clusters = cluster_into_shifts(
                &deliveries,
                &self.config.shift_blocks,
                self.config.service_minutes,
                self.config.average_speed_kmh,
            );

            if !clusters.undelivered.is_empty() {
                let (kept, kept_matrices, removed) = drop_stops(stops, &matrices, &clusters.undelivered);
                stops = kept;
                matrices = kept_matrices;
                dropped = removed
                    .iter()
                    .flat_map(|stop| stop.parcels.iter())
                    .map(|p| {
                        UndeliveredParcel::new(p, UndeliveredReason::NoShiftCapacity)
                            .with_detail(format!("does not fit any shift of truck {}", load.truck_id))
                    })
                    .collect();
                (distance_km, duration_minutes) = measure_route(&stops, &matrices);
                warn!(
                    "Truck {}: {} parcels do not fit any shift",
                    load.truck_id,
                    dropped.len()
                );
            }
            shifts = Some(clusters);
        }

        let route = TruckRoute {
            truck_id: load.truck_id.clone(),
            warehouse_id,
            stops,
            total_distance_km: distance_km,
            total_duration_minutes: duration_minutes,
            shifts,
            matrix_source,
        };
        if route.customer_stops().next().is_none() {
            return (None, dropped);
        }
        (Some(route), dropped)
    }
}

/// Split off customer stops at `coordinates`, keeping the matrices aligned
/// with the remaining stops
fn drop_stops(
    stops: Vec<Stop>,
    matrices: &DistanceTimeMatrices,
    coordinates: &[Coordinates],
) -> (Vec<Stop>, DistanceTimeMatrices, Vec<Stop>) {
    let mut kept = Vec::with_capacity(stops.len());
    let mut kept_indices = Vec::with_capacity(stops.len());
    let mut removed = Vec::new();

    for (index, stop) in stops.into_iter().enumerate() {
        if stop.kind == StopKind::Customer && coordinates.contains(&stop.coordinates) {
            removed.push(stop);
        } else {
            kept_indices.push(index);
            kept.push(stop);
        }
    }

    let kept_matrices = submatrix(matrices, &kept_indices);
    (kept, kept_matrices, removed)
}

fn failed_plan(warehouse_id: i64, parcels: &[Parcel], err: &PlanningError) -> WarehousePlan {
    let reason = match err {
        PlanningError::NoTrucks => UndeliveredReason::NoTruckCapacity,
        _ => UndeliveredReason::PlanningFailed,
    };

    WarehousePlan {
        warehouse_id,
        status: PlanStatus::Failed,
        assignment: None,
        routes: Vec::new(),
        undelivered: parcels
            .iter()
            .map(|p| UndeliveredParcel::new(p, reason).with_detail(err.to_string()))
            .collect(),
        error: Some(err.to_error_detail()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::services::planning::fleet_store::InMemoryFleetStore;
    use crate::services::planning::strategy::BestFitStrategy;
    use crate::services::routing::HaversineRoutingService;
    use crate::types::{Depot, TruckInfo, Warehouse};

    fn parcel(id: &str, volume: f64, warehouse_id: Option<i64>, delivery: Coordinates) -> Parcel {
        Parcel {
            id: id.to_string(),
            name: id.to_string(),
            volume,
            warehouse_id,
            pickup: Coordinates::new(50.05, 14.3),
            delivery,
            recipient: Default::default(),
        }
    }

    fn near(i: u32) -> Coordinates {
        Coordinates::new(50.08 + f64::from(i) * 0.002, 14.42)
    }

    fn request(trucks: Vec<TruckInfo>, parcels: Vec<Parcel>) -> PlanningRequest {
        PlanningRequest {
            depot: Depot {
                id: "D1".to_string(),
                coordinates: Coordinates::new(50.0755, 14.4378),
                trucks,
            },
            warehouses: vec![
                Warehouse { id: 1, coordinates: Coordinates::new(50.1, 14.4) },
                Warehouse { id: 2, coordinates: Coordinates::new(50.06, 14.45) },
            ],
            parcels,
        }
    }

    fn planner_with(store: Arc<dyn FleetStore>, config: PlannerConfig) -> FleetPlanner {
        FleetPlanner::new(
            MatrixProvider::fallback_only(HaversineRoutingService::new()),
            Arc::new(BestFitStrategy),
            store,
            config,
        )
    }

    fn planner(config: PlannerConfig) -> FleetPlanner {
        planner_with(Arc::new(InMemoryFleetStore::new()), config)
    }

    fn parallel() -> PlannerConfig {
        PlannerConfig {
            parallel_partitions: true,
            ..Default::default()
        }
    }

    fn route_parcel_ids(route: &TruckRoute) -> Vec<String> {
        route
            .stops
            .iter()
            .flat_map(|s| s.parcels.iter())
            .map(|p| p.id.clone())
            .collect()
    }

    fn assert_no_truck_shared(response: &PlanningResponse) {
        let mut owner: std::collections::HashMap<&str, i64> = std::collections::HashMap::new();
        for plan in &response.warehouses {
            for route in &plan.routes {
                if let Some(other) = owner.insert(route.truck_id.as_str(), plan.warehouse_id) {
                    assert_eq!(other, plan.warehouse_id, "truck {} serves two warehouses", route.truck_id);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_single_warehouse_scenario() {
        let req = request(
            vec![TruckInfo::new("T1", 60.0)],
            vec![
                parcel("A", 20.0, Some(1), near(1)),
                parcel("B", 10.0, Some(1), near(2)),
                parcel("C", 10.0, Some(1), near(3)),
                parcel("D", 60.0, Some(1), near(4)),
            ],
        );

        let response = planner(PlannerConfig::default()).plan(&req).await;

        assert_eq!(response.trucks_used, 1);
        assert_eq!(response.warehouses.len(), 1);
        let plan = &response.warehouses[0];
        assert_eq!(plan.status, PlanStatus::Success);
        let assignment = plan.assignment.as_ref().unwrap();
        assert_eq!(assignment.capacity_used, 40.0);
        assert!((assignment.utilization_percent - 66.7).abs() < 0.1);

        let route = &response.routes[0];
        assert_eq!(route.stops[0].kind, StopKind::Depot);
        assert_eq!(route.stops[1].kind, StopKind::Warehouse);
        assert_eq!(route.stops[1].coordinates, Coordinates::new(50.1, 14.4));
        assert_eq!(route_parcel_ids(route), vec!["A", "B", "C"]);
        assert_eq!(route.parcel_count(), 3);
        assert_eq!(route.matrix_source, crate::types::MatrixSource::Fallback);
        assert!(route.total_distance_km > 0.0);
        assert!(route.shifts.is_none());

        assert_eq!(response.undelivered.len(), 1);
        assert_eq!(response.undelivered[0].parcel_id, "D");
        assert_eq!(response.undelivered[0].reason, UndeliveredReason::NoTruckCapacity);
        assert_eq!(response.consumed_trucks, vec!["T1".to_string()]);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_unknown_warehouse_uses_first_pickup() {
        let req = request(vec![TruckInfo::new("T1", 60.0)], vec![parcel("A", 1.0, Some(7), near(1))]);

        let response = planner(PlannerConfig::default()).plan(&req).await;

        assert_eq!(response.routes[0].stops[1].coordinates, Coordinates::new(50.05, 14.3));
    }

    #[tokio::test]
    async fn test_invalid_warehouse_parcels_are_reported() {
        let req = request(
            vec![TruckInfo::new("T1", 60.0)],
            vec![
                parcel("A", 1.0, Some(1), near(1)),
                parcel("NONE", 1.0, None, near(2)),
                parcel("ZERO", 1.0, Some(0), near(3)),
            ],
        );

        let response = planner(PlannerConfig::default()).plan(&req).await;

        let invalid: Vec<&str> = response
            .undelivered
            .iter()
            .filter(|u| u.reason == UndeliveredReason::InvalidWarehouse)
            .map(|u| u.parcel_id.as_str())
            .collect();
        assert_eq!(invalid, vec!["NONE", "ZERO"]);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    async fn two_warehouse_run(config: PlannerConfig) {
        let req = request(
            vec![TruckInfo::new("T1", 50.0), TruckInfo::new("T2", 100.0)],
            vec![
                parcel("W1-A", 45.0, Some(1), near(1)),
                parcel("W2-A", 90.0, Some(2), near(2)),
            ],
        );

        let response = planner(config).plan(&req).await;

        assert_no_truck_shared(&response);
        assert!(response.warehouses.iter().all(|w| w.status == PlanStatus::Success));
        assert_eq!(response.trucks_used, 2);
        assert!(response.undelivered.is_empty());
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_no_truck_in_two_warehouses_sequential() {
        two_warehouse_run(PlannerConfig::default()).await;
    }

    #[tokio::test]
    async fn test_no_truck_in_two_warehouses_parallel() {
        two_warehouse_run(parallel()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_partitions_never_double_book() {
        let trucks: Vec<TruckInfo> = (0..6).map(|i| TruckInfo::new(format!("T{}", i), 10.0)).collect();
        let parcels: Vec<Parcel> = (1..=6)
            .map(|w| parcel(&format!("P{}", w), 6.0, Some(w), near(w as u32)))
            .collect();
        let req = request(trucks, parcels);

        let response = planner(parallel()).plan(&req).await;

        assert_no_truck_shared(&response);
        let ids: HashSet<&str> = response.routes.iter().map(|r| r.truck_id.as_str()).collect();
        assert_eq!(ids.len(), 6);
        assert_eq!(response.routes.len(), 6);
        assert!(response.undelivered.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_pool_fails_only_later_warehouse() {
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![parcel("A", 10.0, Some(1), near(1)), parcel("B", 10.0, Some(2), near(2))],
        );

        let response = planner(PlannerConfig::default()).plan(&req).await;

        assert_eq!(response.warehouses[0].status, PlanStatus::Success);
        let failed = &response.warehouses[1];
        assert_eq!(failed.status, PlanStatus::Failed);
        assert_eq!(failed.error.as_ref().unwrap().code, "NO_TRUCKS");
        assert_eq!(failed.undelivered[0].parcel_id, "B");
        assert_eq!(failed.undelivered[0].reason, UndeliveredReason::NoTruckCapacity);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_validation_failure_is_isolated() {
        let req = request(
            vec![TruckInfo::new("T1", 100.0), TruckInfo::new("T2", 100.0)],
            vec![parcel("BAD", -10.0, Some(1), near(1)), parcel("OK", 10.0, Some(2), near(2))],
        );

        let response = planner(PlannerConfig::default()).plan(&req).await;

        let failed = &response.warehouses[0];
        assert_eq!(failed.status, PlanStatus::Failed);
        let error = failed.error.as_ref().unwrap();
        assert_eq!(error.code, "INVALID_PARCEL_VOLUME");
        assert_eq!(error.details.as_ref().unwrap()["parcelId"], "BAD");
        assert_eq!(failed.undelivered[0].reason, UndeliveredReason::PlanningFailed);

        assert_eq!(response.warehouses[1].status, PlanStatus::Success);
        // failed warehouse consumed nothing
        assert_eq!(response.consumed_trucks, vec!["T1".to_string()]);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    struct PanickingStrategy;

    impl AssignmentStrategy for PanickingStrategy {
        fn name(&self) -> &str {
            "panicking"
        }

        fn assign(&self, trucks: &[TruckInfo], parcels: &[Parcel]) -> Result<AssignmentResult, PlanningError> {
            if parcels.iter().any(|p| p.id == "BOOM") {
                panic!("strategy bug");
            }
            BestFitStrategy.assign(trucks, parcels)
        }
    }

    #[tokio::test]
    async fn test_internal_failure_does_not_abort_siblings() {
        let req = request(
            vec![TruckInfo::new("T1", 100.0), TruckInfo::new("T2", 100.0)],
            vec![parcel("BOOM", 1.0, Some(1), near(1)), parcel("OK", 1.0, Some(2), near(2))],
        );
        let planner = FleetPlanner::new(
            MatrixProvider::fallback_only(HaversineRoutingService::new()),
            Arc::new(PanickingStrategy),
            Arc::new(InMemoryFleetStore::new()),
            PlannerConfig::default(),
        );

        let response = planner.plan(&req).await;

        assert_eq!(response.warehouses[0].status, PlanStatus::Failed);
        assert_eq!(response.warehouses[0].error.as_ref().unwrap().code, "INTERNAL_ERROR");
        assert_eq!(response.warehouses[1].status, PlanStatus::Success);
        assert_eq!(route_parcel_ids(&response.routes[0]), vec!["OK"]);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_consumed_trucks_persist_across_runs() {
        let store = Arc::new(InMemoryFleetStore::new());
        let planner = planner_with(store.clone(), PlannerConfig::default());
        let trucks = vec![TruckInfo::new("T1", 50.0), TruckInfo::new("T2", 50.0)];

        let first = planner
            .plan(&request(trucks.clone(), vec![parcel("A", 40.0, Some(1), near(1))]))
            .await;
        assert_eq!(first.consumed_trucks, vec!["T1".to_string()]);
        assert_eq!(store.snapshot().get("T1"), Some(&false));

        let second = planner
            .plan(&request(trucks, vec![parcel("B", 40.0, Some(1), near(2))]))
            .await;
        assert_eq!(second.routes[0].truck_id, "T2");
    }

    #[tokio::test]
    async fn test_unreachable_deliveries_are_no_shift_capacity() {
        let config = PlannerConfig {
            shift_minutes: 30.0,
            shift_blocks: vec![ShiftBlock::new(60.0, 0.0, 0.0)],
            ..Default::default()
        };
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![
                parcel("NEAR", 1.0, Some(1), Coordinates::new(50.11, 14.4)),
                parcel("FAR", 1.0, Some(1), Coordinates::new(51.1, 14.4)),
                parcel("FAR-2", 1.0, Some(1), Coordinates::new(51.1, 14.4)),
            ],
        );

        let response = planner(config).plan(&req).await;

        let route = &response.routes[0];
        assert_eq!(route_parcel_ids(route), vec!["NEAR"]);
        assert_eq!(route.stops.len(), 3);
        let shifts = route.shifts.as_ref().unwrap();
        assert_eq!(shifts.shifts[&0], vec![Coordinates::new(50.11, 14.4)]);
        assert_eq!(shifts.undelivered, vec![Coordinates::new(51.1, 14.4)]);
        // re-measured without the far stop
        assert!(route.total_distance_km < 100.0);

        let assignment = response.warehouses[0].assignment.as_ref().unwrap();
        assert_eq!(assignment.assigned_parcel_count(), 1);
        assert_eq!(assignment.capacity_used, 1.0);

        let reasons: Vec<(&str, UndeliveredReason)> = response
            .undelivered
            .iter()
            .map(|u| (u.parcel_id.as_str(), u.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("FAR", UndeliveredReason::NoShiftCapacity),
                ("FAR-2", UndeliveredReason::NoShiftCapacity)
            ]
        );
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_truck_without_deliverable_stops_is_released() {
        let store = Arc::new(InMemoryFleetStore::new());
        let config = PlannerConfig {
            shift_minutes: 30.0,
            shift_blocks: vec![ShiftBlock::new(60.0, 0.0, 0.0)],
            ..Default::default()
        };
        let planner = planner_with(store.clone(), config);
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![parcel("FAR", 1.0, Some(1), Coordinates::new(51.1, 14.4))],
        );

        let response = planner.plan(&req).await;

        assert!(response.routes.is_empty());
        assert_eq!(response.trucks_used, 0);
        assert_eq!(response.total_distance_km, 0.0);
        assert!(response.consumed_trucks.is_empty());
        assert_eq!(store.snapshot().get("T1"), None);

        let plan = &response.warehouses[0];
        assert_eq!(plan.status, PlanStatus::Success);
        let assignment = plan.assignment.as_ref().unwrap();
        assert!(assignment.assignments.is_empty());
        assert_eq!(assignment.capacity_used, 0.0);
        assert_eq!(response.undelivered[0].parcel_id, "FAR");
        assert_eq!(response.undelivered[0].reason, UndeliveredReason::NoShiftCapacity);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[tokio::test]
    async fn test_released_truck_serves_next_warehouse() {
        let config = PlannerConfig {
            shift_minutes: 30.0,
            shift_blocks: vec![ShiftBlock::new(60.0, 0.0, 0.0)],
            ..Default::default()
        };
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![
                parcel("FAR", 1.0, Some(1), Coordinates::new(51.1, 14.4)),
                parcel("W2", 1.0, Some(2), Coordinates::new(50.061, 14.45)),
            ],
        );

        let response = planner(config).plan(&req).await;

        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].truck_id, "T1");
        assert_eq!(response.routes[0].warehouse_id, 2);
        assert_eq!(response.consumed_trucks, vec!["T1".to_string()]);
        assert!(verify_parcel_coverage(&req.parcels, &response).is_complete());
    }

    #[test]
    fn test_default_blocks_hold_less_than_clustering_threshold() {
        let config = PlannerConfig::default();
        let block_minutes: f64 = config.shift_blocks.iter().map(ShiftBlock::available_minutes).sum();

        assert_eq!(config.shift_minutes, 540.0);
        assert_eq!(block_minutes, 460.0);
    }

    #[tokio::test]
    async fn test_clustering_disabled_keeps_long_route() {
        let config = PlannerConfig {
            shift_clustering: false,
            shift_minutes: 30.0,
            ..Default::default()
        };
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![parcel("FAR", 1.0, Some(1), Coordinates::new(51.1, 14.4))],
        );

        let response = planner(config).plan(&req).await;

        assert!(response.routes[0].shifts.is_none());
        assert!(response.undelivered.is_empty());
    }

    #[tokio::test]
    async fn test_nearest_neighbor_sequencing() {
        let config = PlannerConfig {
            sequencing: RouteSequencing::NearestNeighbor,
            ..Default::default()
        };
        // warehouse 1 is at 50.1, 14.4
        let far = Coordinates::new(50.2, 14.4);
        let close = Coordinates::new(50.11, 14.4);
        let req = request(
            vec![TruckInfo::new("T1", 100.0)],
            vec![parcel("FAR", 1.0, Some(1), far), parcel("CLOSE", 1.0, Some(1), close)],
        );

        let response = planner(config).plan(&req).await;

        let route = &response.routes[0];
        assert_eq!(route.stops[2].coordinates, close);
        assert_eq!(route.stops[3].coordinates, far);
    }

    #[tokio::test]
    async fn test_unavailable_trucks_are_skipped() {
        let mut parked = TruckInfo::new("T1", 100.0);
        parked.available = false;
        let req = request(
            vec![parked, TruckInfo::new("T2", 100.0)],
            vec![parcel("A", 1.0, Some(1), near(1))],
        );

        let response = planner(PlannerConfig::default()).plan(&req).await;

        assert_eq!(response.routes[0].truck_id, "T2");
    }
}
