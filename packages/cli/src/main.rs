#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front-end for per-boundary road length and density reports.
//!
//! Each subcommand reads a boundary layer and a road network layer from
//! `GeoJSON` files. Without a subcommand the tool runs interactively.
//!
//! Uses `indicatif-log-bridge` (via [`road_density_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod config;
mod interactive;
mod manifest;
mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use road_density_engine::cache::AggregateCache;
use road_density_engine_models::Column;

use crate::config::{AppConfig, EngineFlags};

#[derive(Parser)]
#[command(
    name = "road_density_cli",
    about = "Road length and density per boundary"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every subcommand that runs the engine.
#[derive(clap::Args)]
struct LayerArgs {
    /// Boundary polygons (`GeoJSON` `FeatureCollection`)
    #[arg(long)]
    boundaries: PathBuf,
    /// Road polylines (`GeoJSON` `FeatureCollection`)
    #[arg(long)]
    routes: PathBuf,
    /// TOML file with `[engine]`, `[engine.categories]` and `[fields]` tables
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    flags: EngineFlags,
}

impl LayerArgs {
    fn load(&self) -> Result<pipeline::Inputs, Box<dyn std::error::Error>> {
        let config = AppConfig::load(self.config.as_deref())?.with_flags(self.flags);
        pipeline::load_inputs(&self.boundaries, &self.routes, &config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the aggregate table and write it to an output directory
    Run {
        #[command(flatten)]
        layers: LayerArgs,
        /// Directory for `aggregates.csv`, `aggregates.json` and `summary.json`
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
        /// Rewrite outputs even if the inputs are unchanged
        #[arg(long)]
        force: bool,
    },
    /// Print the boundaries with the most road length in one column
    Top {
        #[command(flatten)]
        layers: LayerArgs,
        /// `TOTAL`, a category (e.g. `HIGHWAY`) or a column name (e.g. `highway_km`)
        #[arg(long, default_value = "TOTAL")]
        category: Column,
        /// Number of boundaries to list before the remainder line
        #[arg(long, default_value = "15")]
        limit: usize,
    },
    /// Write the clipped road segments as `GeoJSON`
    Segments {
        #[command(flatten)]
        layers: LayerArgs,
        /// Only keep segments of this category (`TOTAL` keeps all)
        #[arg(long, default_value = "TOTAL")]
        category: Column,
        /// Destination file
        #[arg(long)]
        output: PathBuf,
    },
    /// List road categories, their output columns and source labels
    Categories {
        /// TOML file whose `[engine.categories]` table replaces the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = road_density_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi);
    };

    match command {
        Commands::Run {
            layers,
            out_dir,
            force,
        } => {
            let inputs = layers.load()?;
            let summary =
                pipeline::write_outputs(&inputs, &out_dir, force, &AggregateCache::new(), &multi)?;
            println!("{}", report::format_summary(&summary));
            println!("Outputs in {}", out_dir.display());
        }
        Commands::Top {
            layers,
            category,
            limit,
        } => {
            let inputs = layers.load()?;
            let output = pipeline::run_engine(&inputs, &AggregateCache::new(), &multi)?;
            println!("{}", report::format_ranking(&output.table.ranking(category, limit)));
            if output.summary.has_warnings() {
                println!();
                println!("{}", report::format_summary(&output.summary));
            }
        }
        Commands::Segments {
            layers,
            category,
            output,
        } => {
            let inputs = layers.load()?;
            let written = pipeline::write_segments(&inputs, category, &output, &multi)?;
            println!("Wrote {written} segments to {}", output.display());
        }
        Commands::Categories { config } => {
            let config = AppConfig::load(config.as_deref())?;
            println!("{}", report::format_categories(&config.engine.categories));
        }
    }

    Ok(())
}
