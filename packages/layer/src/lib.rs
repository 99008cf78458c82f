#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reading input layers from disk and writing engine results back out.
//!
//! Both layers are `GeoJSON` `FeatureCollection` files. Property names are
//! configurable through [`LayerFieldMapping`]. Features that cannot be read
//! are reported as [`SkippedFeature`]s and the rest of the layer is kept.
//!
//! [`LayerFieldMapping`]: road_density_layer_models::LayerFieldMapping
//! [`SkippedFeature`]: road_density_layer_models::SkippedFeature

pub mod export;
pub mod load;

use road_density_engine_models::RunSummary;
use road_density_layer_models::{BoundaryRecord, LayerKind, RouteRecord, SkippedFeature};
use thiserror::Error;

pub use export::{segments_to_geojson, write_table_csv, write_table_json};
pub use load::{
    boundaries_from_features, load_boundaries, load_routes, read_feature_collection,
    routes_from_features,
};

/// Errors that can occur while reading or writing layer files.
#[derive(Debug, Error)]
pub enum LayerError {
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file is valid JSON but not a usable layer.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Records read from one layer plus the features that were left out.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLayer<T> {
    pub records: Vec<T>,
    /// Position in the source file of each record.
    pub positions: Vec<usize>,
    /// Features that could not be read, by position in the source file.
    pub skipped: Vec<SkippedFeature>,
}

impl<T> LoadedLayer<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            skipped: Vec::new(),
        }
    }

    fn push(&mut self, position: usize, record: T) {
        self.records.push(record);
        self.positions.push(position);
    }

    /// Maps a record index back to the feature position in the file.
    #[must_use]
    pub fn feature_index(&self, record: usize) -> usize {
        self.positions.get(record).copied().unwrap_or(record)
    }
}

/// Merges load-time skips into an engine run summary.
///
/// The engine numbers skipped features by record index. These are
/// rewritten to feature positions so every entry in the summary refers to
/// the source file. Features dropped while loading are added to the read
/// counts.
pub fn attach_load_skips(
    summary: &mut RunSummary,
    boundaries: &LoadedLayer<BoundaryRecord>,
    routes: &LoadedLayer<RouteRecord>,
) {
    summary.boundaries_read += boundaries.skipped.len();
    summary.routes_read += routes.skipped.len();
    for skipped in &mut summary.skipped {
        skipped.index = match skipped.layer {
            LayerKind::Boundary => boundaries.feature_index(skipped.index),
            LayerKind::Route => routes.feature_index(skipped.index),
        };
    }
    summary.extend_skipped(
        boundaries
            .skipped
            .iter()
            .chain(&routes.skipped)
            .cloned(),
    );
}
