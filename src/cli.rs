//! CLI argument parsing for the fleet-planner binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleet-planner", about = "Truck-to-parcel assignment and route planning")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan routes for a planning request
    Plan {
        /// Planning request JSON file
        #[arg(long)]
        input: PathBuf,
        /// Where to write the response (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the distance/duration matrix for a JSON list of coordinates
    Matrix {
        #[arg(long)]
        input: PathBuf,
    },
}
