#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clips road polylines to boundary polygons and aggregates the clipped
//! lengths per boundary and road category.
//!
//! A run goes through four stages:
//!
//! 1. [`prepare`] normalizes raw coordinates into polygons and polylines,
//!    skipping malformed features instead of failing the batch.
//! 2. [`clip`] tests every (boundary, route) pair for intersection, pruned
//!    by an R-tree in [`index`], and computes the clipped geometry.
//! 3. [`units`] measures each clipped geometry and scales it.
//! 4. [`aggregate`] sums scaled lengths per boundary and category and
//!    derives the density.
//!
//! [`cache::AggregateCache`] memoizes whole runs keyed by a fingerprint of
//! both input layers.

pub mod aggregate;
pub mod cache;
pub mod clip;
pub mod index;
pub mod normalize;
pub mod prepare;
pub mod progress;
pub mod units;

use std::sync::Arc;

use road_density_engine_models::{AggregateTable, EngineConfig, RunSummary};
use road_density_layer_models::{BoundaryId, BoundaryRecord, RouteRecord};
use serde::{Deserialize, Serialize};

use crate::clip::ClipPass;
use crate::prepare::PreparedLayers;
use crate::progress::ProgressCallback;
use crate::units::UnitConverter;

/// Non-fatal problems found while processing a single feature or row.
///
/// None of these abort a run. They are turned into skipped features or
/// undefined values and reported in the [`RunSummary`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A coordinate structure could not be turned into a usable geometry.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// What was wrong with the structure.
        reason: String,
    },

    /// Density requested for a boundary with zero or missing area.
    #[error("density undefined for boundary {boundary}: area is zero or missing")]
    DivisionUndefined {
        /// The boundary in question.
        boundary: BoundaryId,
    },

    /// A route label is not in the category table.
    #[error("unknown road category '{label}'")]
    UnknownCategory {
        /// The unmapped label.
        label: String,
    },

    /// The inputs could not be encoded for fingerprinting.
    #[error("failed to encode inputs for fingerprinting: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOutput {
    /// One row per usable boundary.
    pub table: AggregateTable,
    /// Counts and non-fatal problems.
    pub summary: RunSummary,
}

/// Normalized layers together with the result of the clip pass.
///
/// Exposed for consumers that need the clipped geometry itself, such as
/// map exports.
#[derive(Debug, Clone)]
pub struct ClippedLayers {
    /// The normalized input layers.
    pub prepared: PreparedLayers,
    /// Every clipped (boundary, route) pair.
    pub pass: ClipPass,
}

/// Normalizes both layers and runs the clip pass.
#[must_use]
pub fn clip_layers(
    boundaries: &[BoundaryRecord],
    routes: &[RouteRecord],
    config: &EngineConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> ClippedLayers {
    let progress = progress.unwrap_or_else(progress::null_progress);

    let prepared = PreparedLayers::new(boundaries, routes, config);
    log::info!(
        "Prepared {} of {} boundaries and {} of {} routes",
        prepared.boundaries.len(),
        boundaries.len(),
        prepared.routes.len(),
        routes.len()
    );

    let pass = clip::clip_all(&prepared.boundaries, &prepared.routes, config, &*progress);
    log::info!(
        "Clip pass examined {} candidate pairs, {} intersecting",
        pass.candidate_pairs,
        pass.segments.len()
    );

    ClippedLayers { prepared, pass }
}

/// Runs the whole pipeline over two in-memory layers.
///
/// Malformed features, unknown category labels and boundaries with zero
/// area never fail the run; they show up in [`EngineOutput::summary`].
#[must_use]
pub fn run(
    boundaries: &[BoundaryRecord],
    routes: &[RouteRecord],
    config: &EngineConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> EngineOutput {
    let ClippedLayers { prepared, pass } = clip_layers(boundaries, routes, config, progress);

    let converter = UnitConverter::new(config.length_mode);
    let (table, undefined_densities) =
        aggregate::aggregate(&prepared.boundaries, &pass.segments, converter);

    for id in &undefined_densities {
        log::warn!("Density undefined for boundary {id}: area is zero or missing");
    }

    let mut summary = RunSummary {
        boundaries_read: boundaries.len(),
        routes_read: routes.len(),
        boundaries_used: prepared.boundaries.len(),
        routes_used: prepared.routes.len(),
        unknown_categories: prepared.unknown_categories,
        undefined_densities,
        candidate_pairs: pass.candidate_pairs,
        clipped_segments: pass.segments.len() as u64,
        ..RunSummary::default()
    };
    summary.extend_skipped(prepared.skipped);

    EngineOutput { table, summary }
}
