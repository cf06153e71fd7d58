//! Routing service for distance/time matrix calculations
//!
//! Uses Valhalla when configured. Any failure of the external service is
//! absorbed by [`MatrixProvider`], which serves a great-circle estimate instead.

mod valhalla;

pub use valhalla::{ValhallaClient, ValhallaConfig};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::geo;
use crate::types::{Coordinates, MatrixSource};

/// Distance and time matrices between locations
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTimeMatrices {
    /// Distance in kilometers [i][j] from location i to location j
    pub distances: Vec<Vec<f64>>,
    /// Duration in minutes [i][j] from location i to location j
    pub durations: Vec<Vec<f64>>,
    /// Number of locations
    pub size: usize,
}

impl DistanceTimeMatrices {
    /// Create empty matrices
    pub fn empty() -> Self {
        Self {
            distances: vec![],
            durations: vec![],
            size: 0,
        }
    }

    /// Get distance from location i to location j in kilometers
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from][to]
    }

    /// Get duration from location i to location j in minutes
    pub fn duration(&self, from: usize, to: usize) -> f64 {
        self.durations[from][to]
    }

    /// Check the matrices are `expected` x `expected` with finite, non-negative cells
    pub fn validate(&self, expected: usize) -> Result<()> {
        if self.size != expected
            || self.distances.len() != expected
            || self.durations.len() != expected
        {
            anyhow::bail!(
                "matrix size {} does not match {} locations",
                self.distances.len(),
                expected
            );
        }

        for (row_d, row_t) in self.distances.iter().zip(&self.durations) {
            if row_d.len() != expected || row_t.len() != expected {
                anyhow::bail!("matrix row length does not match {} locations", expected);
            }
            if row_d.iter().chain(row_t).any(|v| !v.is_finite() || *v < 0.0) {
                anyhow::bail!("matrix contains negative or non-finite values");
            }
        }

        Ok(())
    }
}

/// Routing service trait for abstraction (Valhalla, great-circle, test doubles)
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Get distance and time matrices for a list of locations
    async fn get_matrices(&self, locations: &[Coordinates]) -> Result<DistanceTimeMatrices>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Closed-form routing estimate: great-circle distance at a constant speed
#[derive(Debug, Clone)]
pub struct HaversineRoutingService {
    /// Coefficient for converting straight-line to road distance (default: 1.0)
    road_coefficient: f64,
    /// Average speed in km/h for time estimation (default: 40)
    average_speed_kmh: f64,
}

impl Default for HaversineRoutingService {
    fn default() -> Self {
        Self {
            road_coefficient: 1.0,
            average_speed_kmh: geo::AVERAGE_SPEED_KMH,
        }
    }
}

impl HaversineRoutingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }

    /// Compute matrices locally. Never fails.
    pub fn compute(&self, locations: &[Coordinates]) -> DistanceTimeMatrices {
        let n = locations.len();
        let distances = geo::distance_matrix(locations, self.road_coefficient);
        let durations = distances
            .iter()
            .map(|row| {
                row.iter()
                    .map(|d| geo::travel_minutes(*d, self.average_speed_kmh))
                    .collect()
            })
            .collect();

        DistanceTimeMatrices {
            distances,
            durations,
            size: n,
        }
    }
}

#[async_trait]
impl RoutingService for HaversineRoutingService {
    async fn get_matrices(&self, locations: &[Coordinates]) -> Result<DistanceTimeMatrices> {
        Ok(self.compute(locations))
    }

    fn name(&self) -> &str {
        "Haversine"
    }
}

/// Matrix source used by the planner: primary service with a local fallback.
///
/// There is no retry; a failed or slow primary call is answered from the
/// fallback and the caller learns which path served it.
#[derive(Clone)]
pub struct MatrixProvider {
    primary: Option<Arc<dyn RoutingService>>,
    fallback: HaversineRoutingService,
    timeout: Duration,
}

impl MatrixProvider {
    pub fn new(
        primary: Option<Arc<dyn RoutingService>>,
        fallback: HaversineRoutingService,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Provider without an external service
    pub fn fallback_only(fallback: HaversineRoutingService) -> Self {
        Self::new(None, fallback, Duration::from_secs(0))
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_ref().map(|p| p.name())
    }

    pub async fn get_matrices(&self, locations: &[Coordinates]) -> (DistanceTimeMatrices, MatrixSource) {
        self.get_matrices_cancellable(locations, &CancellationToken::new()).await
    }

    /// Fetch matrices, giving up on the primary service when `cancel` fires or
    /// the timeout elapses.
    pub async fn get_matrices_cancellable(
        &self,
        locations: &[Coordinates],
        cancel: &CancellationToken,
    ) -> (DistanceTimeMatrices, MatrixSource) {
        if let Some(primary) = &self.primary {
            match self.query_primary(primary.as_ref(), locations, cancel).await {
                Ok(matrices) => {
                    debug!("{} served {}x{} matrix", primary.name(), matrices.size, matrices.size);
                    return (matrices, MatrixSource::Primary);
                }
                Err(e) => {
                    warn!(
                        "Primary routing service {} failed: {}. Falling back to great-circle estimate.",
                        primary.name(),
                        e
                    );
                }
            }
        }

        (self.fallback.compute(locations), MatrixSource::Fallback)
    }

    async fn query_primary(
        &self,
        primary: &dyn RoutingService,
        locations: &[Coordinates],
        cancel: &CancellationToken,
    ) -> Result<DistanceTimeMatrices> {
        let matrices = tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("matrix request cancelled"),
            outcome = tokio::time::timeout(self.timeout, primary.get_matrices(locations)) => {
                match outcome {
                    Ok(result) => result?,
                    Err(_) => anyhow::bail!("timed out after {:?}", self.timeout),
                }
            }
        };

        matrices.validate(locations.len())?;
        Ok(matrices)
    }
}

/// Create the matrix provider with automatic Valhalla detection
///
/// Tries to reach Valhalla if a URL is provided. Without a URL, or when
/// Valhalla does not answer its status endpoint, only the fallback is used.
pub async fn create_matrix_provider(
    valhalla_url: Option<String>,
    timeout: Duration,
    fallback: HaversineRoutingService,
) -> Result<MatrixProvider> {
    if let Some(url) = valhalla_url {
        match check_valhalla_health(&url).await {
            Ok(()) => {
                info!("Valhalla routing service available at {}", url);
                let mut config = ValhallaConfig::new(&url);
                config.timeout_seconds = timeout.as_secs().max(1);
                let client = ValhallaClient::new(config)?;
                return Ok(MatrixProvider::new(Some(Arc::new(client)), fallback, timeout));
            }
            Err(e) => {
                warn!("Valhalla not available at {}: {}. Using great-circle estimates.", url, e);
            }
        }
    }

    info!("Using great-circle routing (Valhalla not configured or unavailable)");
    Ok(MatrixProvider::fallback_only(fallback))
}

/// Check if Valhalla is healthy by making a simple status request
async fn check_valhalla_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", base_url);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("Valhalla returned status {}", response.status())
    }
}
