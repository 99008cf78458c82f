//! Converts `GeoJSON` features into boundary and route records.
//!
//! Only the `properties` named by the [`LayerFieldMapping`] and the
//! `geometry.coordinates` member are read. The geometry type is not
//! checked here: the engine infers the structure from the nesting depth.

use std::path::Path;

use road_density_layer_models::{
    BoundaryId, BoundaryRecord, LayerFieldMapping, LayerKind, RawCoordinates, RouteRecord,
    SkippedFeature,
};
use serde::Deserialize as _;

use crate::{LayerError, LoadedLayer};

/// Reads the `features` array of a `FeatureCollection` file.
///
/// # Errors
///
/// Returns [`LayerError`] if the file cannot be read, is not valid JSON, or
/// has no `features` array.
pub fn read_feature_collection(path: &Path) -> Result<Vec<serde_json::Value>, LayerError> {
    let body = std::fs::read_to_string(path)?;
    let mut json: serde_json::Value = serde_json::from_str(&body)?;

    match json.get_mut("features").map(serde_json::Value::take) {
        Some(serde_json::Value::Array(features)) => Ok(features),
        _ => Err(LayerError::Conversion {
            message: format!("No features array in {}", path.display()),
        }),
    }
}

/// Loads the boundary layer from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`LayerError`] if the file itself cannot be read. Individual bad
/// features are skipped.
pub fn load_boundaries(
    path: &Path,
    fields: &LayerFieldMapping,
) -> Result<LoadedLayer<BoundaryRecord>, LayerError> {
    let features = read_feature_collection(path)?;
    let layer = boundaries_from_features(&features, fields);
    log::info!(
        "Read {} boundaries from {} ({} skipped)",
        layer.records.len(),
        path.display(),
        layer.skipped.len()
    );
    Ok(layer)
}

/// Loads the road network layer from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`LayerError`] if the file itself cannot be read. Individual bad
/// features are skipped.
pub fn load_routes(
    path: &Path,
    fields: &LayerFieldMapping,
) -> Result<LoadedLayer<RouteRecord>, LayerError> {
    let features = read_feature_collection(path)?;
    let layer = routes_from_features(&features, fields);
    log::info!(
        "Read {} routes from {} ({} skipped)",
        layer.records.len(),
        path.display(),
        layer.skipped.len()
    );
    Ok(layer)
}

/// Converts parsed features into boundary records.
///
/// A feature without an identifier or coordinates is skipped. A missing or
/// non-numeric area is kept as `None`.
#[must_use]
pub fn boundaries_from_features(
    features: &[serde_json::Value],
    fields: &LayerFieldMapping,
) -> LoadedLayer<BoundaryRecord> {
    let mut layer = LoadedLayer::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let props = feature.get("properties");
        let id = props
            .and_then(|p| p.get(&fields.boundary_id))
            .and_then(boundary_id);

        let Some(id) = id else {
            layer.skipped.push(skip(
                LayerKind::Boundary,
                index,
                None,
                format!("missing '{}' property", fields.boundary_id),
            ));
            continue;
        };

        let coordinates = match coordinates(feature) {
            Ok(coordinates) => coordinates,
            Err(reason) => {
                layer.skipped.push(skip(LayerKind::Boundary, index, Some(&id), reason));
                continue;
            }
        };

        let area = props
            .and_then(|p| p.get(&fields.boundary_area))
            .and_then(number);
        if area.is_none() {
            log::debug!("Boundary {id} has no usable '{}' value", fields.boundary_area);
        }

        layer.push(
            index,
            BoundaryRecord {
                id,
                area,
                coordinates,
            },
        );
    }

    layer
}

/// Converts parsed features into route records.
///
/// A missing, null or blank category label is kept as an empty label, so
/// the route still counts towards boundary totals. Only a feature without
/// coordinates is skipped.
#[must_use]
pub fn routes_from_features(
    features: &[serde_json::Value],
    fields: &LayerFieldMapping,
) -> LoadedLayer<RouteRecord> {
    let mut layer = LoadedLayer::with_capacity(features.len());

    for (index, feature) in features.iter().enumerate() {
        let category = feature
            .get("properties")
            .and_then(|p| p.get(&fields.route_category))
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if category.is_empty() {
            log::debug!(
                "Route feature #{index} has no '{}' value",
                fields.route_category
            );
        }

        match coordinates(feature) {
            Ok(coordinates) => layer.push(
                index,
                RouteRecord {
                    category: category.to_string(),
                    coordinates,
                },
            ),
            Err(reason) => layer
                .skipped
                .push(skip(LayerKind::Route, index, None, reason)),
        }
    }

    layer
}

fn coordinates(feature: &serde_json::Value) -> Result<RawCoordinates, String> {
    let raw = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .and_then(|g| g.get("coordinates"))
        .ok_or_else(|| "missing geometry".to_string())?;

    RawCoordinates::deserialize(raw).map_err(|e| format!("unreadable coordinates: {e}"))
}

fn boundary_id(value: &serde_json::Value) -> Option<BoundaryId> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(BoundaryId::new(s.trim())),
        serde_json::Value::Number(n) => Some(BoundaryId::new(n.to_string())),
        _ => None,
    }
}

/// Reads a JSON number, or a string holding one.
fn number(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn skip(
    layer: LayerKind,
    index: usize,
    id: Option<&BoundaryId>,
    reason: String,
) -> SkippedFeature {
    log::warn!("Skipping {layer} feature #{index}: {reason}");
    SkippedFeature {
        layer,
        index,
        id: id.map(ToString::to_string),
        reason,
    }
}
