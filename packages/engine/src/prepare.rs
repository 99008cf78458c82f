//! Turns input records into validated geometries ready for clipping.

use std::collections::{BTreeMap, BTreeSet};

use geo::{LineString, MultiPolygon};
use road_density_engine_models::{EngineConfig, RingPolicy};
use road_density_layer_models::{
    BoundaryId, BoundaryRecord, LayerKind, RouteRecord, SkippedFeature,
};
use road_density_road_models::{CategoryMapping, CategoryTag, RoadCategory};
use rstar::AABB;

use crate::EngineError;
use crate::index::compute_envelope;
use crate::normalize::{boundary_shape, route_line};

/// A boundary with its polygon geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBoundary {
    /// Position in the input layer.
    pub index: usize,
    pub id: BoundaryId,
    pub area: Option<f64>,
    pub shape: MultiPolygon<f64>,
    pub envelope: AABB<[f64; 2]>,
}

/// A route with its polyline and classified category.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRoute {
    /// Position in the input layer.
    pub index: usize,
    pub category: CategoryTag,
    pub line: LineString<f64>,
    pub envelope: AABB<[f64; 2]>,
}

/// Both layers after normalization, plus everything that was left out.
#[derive(Debug, Clone, Default)]
pub struct PreparedLayers {
    pub boundaries: Vec<PreparedBoundary>,
    pub routes: Vec<PreparedRoute>,
    /// Features that could not be used, in input order per layer.
    pub skipped: Vec<SkippedFeature>,
    /// Unmapped route labels and how many routes carry each.
    pub unknown_categories: BTreeMap<String, u64>,
}

impl PreparedLayers {
    /// Normalizes both layers according to `config`.
    #[must_use]
    pub fn new(
        boundaries: &[BoundaryRecord],
        routes: &[RouteRecord],
        config: &EngineConfig,
    ) -> Self {
        let (boundaries, mut skipped) = prepare_boundaries(boundaries, config.ring_policy);
        let (routes, route_skips, unknown_categories) =
            prepare_routes(routes, &config.categories);
        skipped.extend(route_skips);

        Self {
            boundaries,
            routes,
            skipped,
            unknown_categories,
        }
    }
}

/// Builds polygons for every boundary record.
///
/// Records with invalid geometry are skipped. When an identifier occurs
/// more than once the first occurrence wins.
#[must_use]
pub fn prepare_boundaries(
    records: &[BoundaryRecord],
    policy: RingPolicy,
) -> (Vec<PreparedBoundary>, Vec<SkippedFeature>) {
    let mut seen = BTreeSet::new();
    let mut prepared = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let skip = |reason: String| {
            log::warn!("Skipping boundary #{index} ({}): {reason}", record.id);
            SkippedFeature {
                layer: LayerKind::Boundary,
                index,
                id: Some(record.id.to_string()),
                reason,
            }
        };

        if seen.contains(&record.id) {
            skipped.push(skip("duplicate identifier".to_string()));
            continue;
        }

        let shape = match boundary_shape(&record.coordinates, policy) {
            Ok(shape) => shape,
            Err(e) => {
                skipped.push(skip(e.to_string()));
                continue;
            }
        };
        let Some(envelope) = compute_envelope(&shape) else {
            skipped.push(skip("geometry has no extent".to_string()));
            continue;
        };

        seen.insert(record.id.clone());
        prepared.push(PreparedBoundary {
            index,
            id: record.id.clone(),
            area: record.area,
            shape,
            envelope,
        });
    }

    (prepared, skipped)
}

/// Builds polylines for every route record and classifies their labels.
///
/// Routes with an unmapped label are kept: they count towards the total
/// length of a boundary but towards no category.
#[must_use]
pub fn prepare_routes(
    records: &[RouteRecord],
    mapping: &CategoryMapping,
) -> (Vec<PreparedRoute>, Vec<SkippedFeature>, BTreeMap<String, u64>) {
    let mut prepared = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    let mut unknown: BTreeMap<String, u64> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let geometry = route_line(&record.coordinates).and_then(|line| {
            compute_envelope(&line)
                .map(|envelope| (line, envelope))
                .ok_or_else(|| EngineError::InvalidGeometry {
                    reason: "geometry has no extent".to_string(),
                })
        });
        let (line, envelope) = match geometry {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Skipping route #{index}: {e}");
                skipped.push(SkippedFeature {
                    layer: LayerKind::Route,
                    index,
                    id: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let category = match resolve_category(mapping, &record.category) {
            Ok(category) => CategoryTag::Known(category),
            Err(e) => {
                let label = record.category.trim().to_string();
                let count = unknown.entry(label.clone()).or_insert(0);
                if *count == 0 {
                    log::warn!("{e}: counted towards totals only");
                }
                *count += 1;
                CategoryTag::Unknown(label)
            }
        };

        prepared.push(PreparedRoute {
            index,
            category,
            line,
            envelope,
        });
    }

    (prepared, skipped, unknown)
}

/// Looks `label` up in the category table.
///
/// # Errors
///
/// Returns [`EngineError::UnknownCategory`] if the label is not mapped.
pub fn resolve_category(
    mapping: &CategoryMapping,
    label: &str,
) -> Result<RoadCategory, EngineError> {
    match mapping.classify(label) {
        CategoryTag::Known(category) => Ok(category),
        CategoryTag::Unknown(label) => Err(EngineError::UnknownCategory { label }),
    }
}
