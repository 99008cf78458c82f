//! Interactive mode, used when no subcommand is given.
//!
//! Prompts for the two layers and then lets the user browse rankings for
//! any column. Repeated rankings reuse the first engine run.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use road_density_cli_utils::MultiProgress;
use road_density_engine::cache::AggregateCache;

use crate::config::AppConfig;
use crate::{pipeline, report};

/// Runs the interactive session.
///
/// # Errors
///
/// Returns an error if a prompt fails, a layer cannot be read, or the
/// engine inputs cannot be fingerprinted.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let boundaries: String = Input::new()
        .with_prompt("Boundary layer (GeoJSON)")
        .interact_text()?;
    let routes: String = Input::new()
        .with_prompt("Road network layer (GeoJSON)")
        .interact_text()?;

    let config_path: String = Input::new()
        .with_prompt("Config file (leave empty for defaults)")
        .allow_empty(true)
        .interact_text()?;
    let config_path = Some(config_path.trim())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let inputs = pipeline::load_inputs(
        &PathBuf::from(boundaries.trim()),
        &PathBuf::from(routes.trim()),
        &config,
    )?;

    let cache = AggregateCache::new();
    let columns = report::columns();
    let labels: Vec<String> = columns
        .iter()
        .map(|c| format!("{} ({c})", c.display_label()))
        .collect();

    loop {
        let idx = Select::new()
            .with_prompt("Rank boundaries by")
            .items(&labels)
            .default(0)
            .interact()?;
        let column = columns[idx];

        let limit: usize = Input::new()
            .with_prompt("Number of boundaries to list")
            .default(15)
            .interact_text()?;

        let output = pipeline::run_engine(&inputs, &cache, multi)?;

        println!();
        println!("{}", report::format_ranking(&output.table.ranking(column, limit)));
        println!();
        println!("Density per boundary:");
        println!("{}", report::format_densities(&output.table, column));
        println!();

        if output.summary.has_warnings() {
            println!("{}", report::format_summary(&output.summary));
            println!();
        }

        let again = Confirm::new()
            .with_prompt("Show another column?")
            .default(true)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}
