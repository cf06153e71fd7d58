//! Fleet Planner - command line driver
//!
//! Reads a planning request, runs the planner and writes the response as JSON.

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_planner::config::Config;
use fleet_planner::services::planning::{create_strategy, FleetPlanner, InMemoryFleetStore};
use fleet_planner::services::routing::{create_matrix_provider, HaversineRoutingService, MatrixProvider};
use fleet_planner::types::{Coordinates, PlanningRequest};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "fleet-planner.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // stdout carries the JSON result, so console logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fleet_planner=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Configuration loaded");

    match cli.command {
        Some(Command::Plan { input, output }) => run_plan(&config, &input, output.as_deref()).await,
        Some(Command::Matrix { input }) => run_matrix(&config, &input).await,
        None => {
            Cli::command().print_help()?;
            anyhow::bail!("no command given")
        }
    }
}

async fn matrix_provider(config: &Config) -> Result<MatrixProvider> {
    let fallback = HaversineRoutingService::with_params(1.0, config.average_speed_kmh);
    create_matrix_provider(config.valhalla_url.clone(), config.routing_timeout(), fallback).await
}

async fn run_plan(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read planning request {}", input.display()))?;
    let request: PlanningRequest =
        serde_json::from_str(&raw).context("Failed to parse planning request")?;

    let planner = FleetPlanner::new(
        matrix_provider(config).await?,
        create_strategy(config.strategy, config.solver.clone()),
        Arc::new(InMemoryFleetStore::with_trucks(&request.depot.trucks)),
        config.planner_config(),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning routing service calls");
            on_signal.cancel();
        }
    });

    let response = planner.plan_with_cancellation(&request, &cancel).await;
    let body = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;

    match output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("Failed to write response to {}", path.display()))?;
            info!("Response written to {}", path.display());
        }
        None => println!("{}", body),
    }

    Ok(())
}

async fn run_matrix(config: &Config, input: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read coordinates {}", input.display()))?;
    let locations: Vec<Coordinates> =
        serde_json::from_str(&raw).context("Failed to parse coordinate list")?;

    let provider = matrix_provider(config).await?;
    let (matrices, source) = provider.get_matrices(&locations).await;

    let body = json!({
        "source": source,
        "size": matrices.size,
        "distancesKm": matrices.distances,
        "durationsMinutes": matrices.durations,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
