//! Loads the two layers, runs the engine and writes its outputs.
//!
//! Shared by the subcommands and the interactive mode. Engine results are
//! memoized per process in an [`AggregateCache`] and on disk through the
//! output directory's [`Manifest`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use road_density_cli_utils::{IndicatifProgress, MultiProgress};
use road_density_engine::cache::{AggregateCache, LayerFingerprint};
use road_density_engine::units::UnitConverter;
use road_density_engine::{ClippedLayers, EngineOutput};
use road_density_engine_models::{Column, EngineConfig, RunSummary};
use road_density_layer::{LoadedLayer, attach_load_skips};
use road_density_layer_models::{BoundaryRecord, RouteRecord};

use crate::config::AppConfig;
use crate::manifest::{self, MANIFEST_VERSION, Manifest};

pub const OUTPUT_TABLE_CSV: &str = "aggregates.csv";
pub const OUTPUT_TABLE_JSON: &str = "aggregates.json";
pub const OUTPUT_SUMMARY: &str = "summary.json";

const OUTPUTS: &[&str] = &[OUTPUT_TABLE_CSV, OUTPUT_TABLE_JSON, OUTPUT_SUMMARY];

/// Both layers as read from disk plus the effective engine configuration.
pub struct Inputs {
    pub boundaries: LoadedLayer<BoundaryRecord>,
    pub routes: LoadedLayer<RouteRecord>,
    pub config: EngineConfig,
}

impl Inputs {
    /// Fingerprints both layers and the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs cannot be encoded.
    pub fn fingerprint(&self) -> Result<LayerFingerprint, Box<dyn std::error::Error>> {
        Ok(LayerFingerprint::compute(
            &self.boundaries.records,
            &self.routes.records,
            &self.config,
        )?)
    }

    /// Fingerprint of everything written to an output directory.
    ///
    /// Extends [`Self::fingerprint`] with the feature positions and the
    /// features dropped while loading, which end up in the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs cannot be encoded.
    pub fn output_fingerprint(&self) -> Result<LayerFingerprint, Box<dyn std::error::Error>> {
        Ok(self.fingerprint()?.combine(&(
            &self.boundaries.positions,
            &self.boundaries.skipped,
            &self.routes.positions,
            &self.routes.skipped,
        ))?)
    }
}

/// Reads both layers using the field names in `config`.
///
/// # Errors
///
/// Returns an error if either file cannot be read as a feature collection.
pub fn load_inputs(
    boundaries: &Path,
    routes: &Path,
    config: &AppConfig,
) -> Result<Inputs, Box<dyn std::error::Error>> {
    let boundaries = road_density_layer::load_boundaries(boundaries, &config.fields)?;
    let routes = road_density_layer::load_routes(routes, &config.fields)?;

    Ok(Inputs {
        boundaries,
        routes,
        config: config.engine.clone(),
    })
}

/// Runs the engine, reusing a cached result for identical inputs.
///
/// Skipped features in the returned summary are numbered by their position
/// in the source files and include those dropped while loading.
///
/// # Errors
///
/// Returns an error if the inputs cannot be fingerprinted.
pub fn run_engine(
    inputs: &Inputs,
    cache: &AggregateCache,
    multi: &MultiProgress,
) -> Result<EngineOutput, Box<dyn std::error::Error>> {
    let fingerprint = inputs.fingerprint()?;
    let start = Instant::now();

    let shared = cache.get_or_compute(&fingerprint, || {
        let progress = IndicatifProgress::routes_bar(multi, "Clipping routes");
        road_density_engine::run(
            &inputs.boundaries.records,
            &inputs.routes.records,
            &inputs.config,
            Some(progress),
        )
    });
    log::info!("Engine run finished in {:.1?}", start.elapsed());

    let mut output = EngineOutput::clone(&shared);
    attach_load_skips(&mut output.summary, &inputs.boundaries, &inputs.routes);
    Ok(output)
}

/// Writes the table and summary into `out_dir`.
///
/// Outputs already produced from the same fingerprint are left untouched
/// unless `force` is set. When every output is current the engine does not
/// run at all and the stored summary is returned.
///
/// # Errors
///
/// Returns an error if the engine inputs cannot be fingerprinted or an
/// output cannot be written.
pub fn write_outputs(
    inputs: &Inputs,
    out_dir: &Path,
    force: bool,
    cache: &AggregateCache,
    multi: &MultiProgress,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out_dir)?;

    let fingerprint = inputs.output_fingerprint()?;
    let existing = manifest::load_manifest(out_dir);

    let mut stale: Vec<&str> = OUTPUTS
        .iter()
        .copied()
        .filter(|name| {
            manifest::output_needs_regen(
                existing.as_ref(),
                fingerprint.as_str(),
                name,
                &out_dir.join(name),
                force,
            )
        })
        .collect();

    if stale.is_empty() {
        if let Some(summary) = read_summary(&out_dir.join(OUTPUT_SUMMARY)) {
            log::info!(
                "Outputs in {} are up to date (fingerprint {fingerprint})",
                out_dir.display()
            );
            return Ok(summary);
        }
        stale.push(OUTPUT_SUMMARY);
    }

    let output = run_engine(inputs, cache, multi)?;

    let mut manifest = match existing {
        Some(m) if m.version == MANIFEST_VERSION && m.fingerprint == fingerprint.as_str() => m,
        _ => Manifest::new(fingerprint.to_string()),
    };

    for name in stale {
        let path = out_dir.join(name);
        let writer = BufWriter::new(File::create(&path)?);
        match name {
            OUTPUT_TABLE_CSV => road_density_layer::write_table_csv(writer, &output.table)?,
            OUTPUT_TABLE_JSON => road_density_layer::write_table_json(writer, &output.table)?,
            _ => serde_json::to_writer_pretty(writer, &output.summary)?,
        }
        log::info!("Wrote {}", path.display());

        manifest::record_output(&mut manifest, name);
        manifest::save_manifest(out_dir, &manifest)?;
    }

    Ok(output.summary)
}

fn read_summary(path: &Path) -> Option<RunSummary> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(summary) => Some(summary),
        Err(e) => {
            log::warn!("Failed to parse {}: {e}", path.display());
            None
        }
    }
}

/// Writes the clipped road geometry as a `GeoJSON` feature collection.
///
/// [`Column::Total`] keeps every segment; a category column keeps only the
/// segments of that category. Returns the number of features written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_segments(
    inputs: &Inputs,
    column: Column,
    output: &Path,
    multi: &MultiProgress,
) -> Result<usize, Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::routes_bar(multi, "Clipping routes");
    let ClippedLayers { prepared, pass } = road_density_engine::clip_layers(
        &inputs.boundaries.records,
        &inputs.routes.records,
        &inputs.config,
        Some(progress),
    );

    let filter = match column {
        Column::Total => None,
        Column::Category(category) => Some(category),
    };
    let collection = road_density_layer::segments_to_geojson(
        &pass.segments,
        &prepared.boundaries,
        &prepared.routes,
        &inputs.routes.positions,
        filter,
        UnitConverter::new(inputs.config.length_mode),
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    serde_json::to_writer(BufWriter::new(File::create(output)?), &collection)?;
    log::info!(
        "Wrote {} segments to {}",
        collection.features.len(),
        output.display()
    );

    Ok(collection.features.len())
}
