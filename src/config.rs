//! Configuration management

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::defaults;
use crate::services::geo;
use crate::services::planning::{PlannerConfig, RouteSequencing, SolverConfig, StrategyKind};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Valhalla routing engine URL (optional, falls back to great-circle estimates)
    pub valhalla_url: Option<String>,

    /// Per-call timeout for the routing service
    pub routing_timeout_seconds: u64,

    pub strategy: StrategyKind,

    /// Solver time budget for the pragmatic strategy
    pub solver: SolverConfig,

    /// Speed for fallback travel times and shift estimates
    pub average_speed_kmh: f64,

    /// Average time spent at each delivery
    pub service_minutes: f64,

    pub shift_clustering: bool,

    pub sequencing: RouteSequencing,

    pub parallel_partitions: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let valhalla_url = lookup("VALHALLA_URL").filter(|url| !url.trim().is_empty());

        let routing_timeout_seconds = parse_or(
            &lookup,
            "ROUTING_TIMEOUT_SECONDS",
            defaults::DEFAULT_ROUTING_TIMEOUT_SECONDS,
        )?;
        if routing_timeout_seconds == 0 {
            anyhow::bail!("ROUTING_TIMEOUT_SECONDS must be at least 1");
        }

        let strategy = parse_or(&lookup, "ASSIGNMENT_STRATEGY", StrategyKind::default())?;
        let solver = match lookup("SOLVER_PRESET").as_deref().map(str::trim) {
            None | Some("") | Some("fast") => SolverConfig::fast(),
            Some("quality") => SolverConfig::quality(),
            Some("instant") => SolverConfig::instant(),
            Some("default") => SolverConfig::default(),
            Some(other) => anyhow::bail!(
                "SOLVER_PRESET must be one of fast, quality, instant, default (got '{}')",
                other
            ),
        };

        let average_speed_kmh = parse_or(&lookup, "AVERAGE_SPEED_KMH", geo::AVERAGE_SPEED_KMH)?;
        if !(average_speed_kmh > 0.0) || !average_speed_kmh.is_finite() {
            anyhow::bail!("AVERAGE_SPEED_KMH must be positive (got {})", average_speed_kmh);
        }

        let service_minutes = parse_or(&lookup, "SERVICE_MINUTES", defaults::DEFAULT_SERVICE_MINUTES)?;
        if !(service_minutes >= 0.0) || !service_minutes.is_finite() {
            anyhow::bail!("SERVICE_MINUTES must not be negative (got {})", service_minutes);
        }

        let shift_clustering = parse_flag(&lookup, "SHIFT_CLUSTERING", true)?;
        let sequencing = parse_or(&lookup, "ROUTE_SEQUENCING", RouteSequencing::default())?;
        let parallel_partitions = parse_flag(&lookup, "PARALLEL_PARTITIONS", false)?;

        Ok(Self {
            valhalla_url,
            routing_timeout_seconds,
            strategy,
            solver,
            average_speed_kmh,
            service_minutes,
            shift_clustering,
            sequencing,
            parallel_partitions,
        })
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_seconds)
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            shift_clustering: self.shift_clustering,
            service_minutes: self.service_minutes,
            average_speed_kmh: self.average_speed_kmh,
            sequencing: self.sequencing,
            parallel_partitions: self.parallel_partitions,
            ..PlannerConfig::default()
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value '{}' for {}", raw, key)),
        _ => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{} must be true or false (got '{}')", key, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(config.valhalla_url.is_none());
        assert_eq!(config.routing_timeout(), Duration::from_secs(10));
        assert_eq!(config.strategy, StrategyKind::BestFit);
        assert_eq!(config.average_speed_kmh, 40.0);
        assert_eq!(config.service_minutes, 10.0);
        assert!(config.shift_clustering);
        assert_eq!(config.sequencing, RouteSequencing::FirstSeen);
        assert!(!config.parallel_partitions);
        assert_eq!(config.solver.max_time_seconds, SolverConfig::fast().max_time_seconds);
    }

    #[test]
    fn test_config_reads_values() {
        let config = config_from(&[
            ("VALHALLA_URL", "http://localhost:8002"),
            ("ROUTING_TIMEOUT_SECONDS", "3"),
            ("ASSIGNMENT_STRATEGY", "pragmatic"),
            ("SOLVER_PRESET", "quality"),
            ("AVERAGE_SPEED_KMH", "55.5"),
            ("SERVICE_MINUTES", "0"),
            ("SHIFT_CLUSTERING", "false"),
            ("ROUTE_SEQUENCING", "nearest_neighbor"),
            ("PARALLEL_PARTITIONS", "1"),
        ])
        .unwrap();

        assert_eq!(config.valhalla_url, Some("http://localhost:8002".to_string()));
        assert_eq!(config.routing_timeout_seconds, 3);
        assert_eq!(config.strategy, StrategyKind::Pragmatic);
        assert_eq!(config.solver.max_generations, SolverConfig::quality().max_generations);
        assert_eq!(config.average_speed_kmh, 55.5);
        assert!(!config.shift_clustering);
        assert_eq!(config.sequencing, RouteSequencing::NearestNeighbor);
        assert!(config.parallel_partitions);

        let planner = config.planner_config();
        assert_eq!(planner.service_minutes, 0.0);
        assert_eq!(planner.shift_minutes, 540.0);
        assert!(planner.parallel_partitions);
    }

    #[test]
    fn test_config_empty_valhalla_url_is_none() {
        let config = config_from(&[("VALHALLA_URL", "  ")]).unwrap();
        assert!(config.valhalla_url.is_none());
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        assert!(config_from(&[("ROUTING_TIMEOUT_SECONDS", "soon")]).is_err());
        assert!(config_from(&[("ROUTING_TIMEOUT_SECONDS", "0")]).is_err());
        assert!(config_from(&[("ASSIGNMENT_STRATEGY", "random")]).is_err());
        assert!(config_from(&[("AVERAGE_SPEED_KMH", "-5")]).is_err());
        assert!(config_from(&[("SERVICE_MINUTES", "-1")]).is_err());
        assert!(config_from(&[("SHIFT_CLUSTERING", "maybe")]).is_err());
        assert!(config_from(&[("SOLVER_PRESET", "slow")]).is_err());
    }

    #[test]
    fn test_config_error_names_variable() {
        let err = config_from(&[("ROUTE_SEQUENCING", "spiral")]).unwrap_err();
        assert!(format!("{:#}", err).contains("ROUTE_SEQUENCING"));
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_from_env_reads_valhalla_url() {
        std::env::set_var("VALHALLA_URL", "http://localhost:8002");

        let config = Config::from_env().unwrap();
        assert_eq!(config.valhalla_url, Some("http://localhost:8002".to_string()));

        std::env::remove_var("VALHALLA_URL");
    }
}
