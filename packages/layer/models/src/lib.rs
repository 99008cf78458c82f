#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input record types for the boundary layer and the road network layer.
//!
//! Records carry their geometry as [`RawCoordinates`], the untouched nested
//! `coordinates` array of the source feature. Turning that into polygons and
//! polylines is the engine's job, so malformed input can be reported per
//! feature instead of failing the whole layer at load time.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A nested coordinate array exactly as it appears in a `GeoJSON` geometry.
///
/// A position is an array of numbers, a ring or polyline is an array of
/// positions, and so on. Nothing about the nesting depth is assumed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinates {
    /// A single coordinate component.
    Number(f64),
    /// A nested array level.
    Array(Vec<Self>),
}

impl RawCoordinates {
    /// Nesting depth measured along the first element of each level.
    ///
    /// A number has depth 0, a position (`[x, y]`) depth 1, a polyline or
    /// ring depth 2, a polygon depth 3 and a multi-polygon depth 4. An empty
    /// array has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Number(_) => 0,
            Self::Array(items) => 1 + items.first().map_or(0, Self::depth),
        }
    }

    /// Returns the nested items if this is an array level.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            Self::Number(_) => None,
        }
    }

    /// Returns the numeric value if this is a leaf.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Array(_) => None,
        }
    }

    /// Builds a flat polyline/ring structure (`[[x, y], ...]`).
    #[must_use]
    pub fn line(points: &[[f64; 2]]) -> Self {
        Self::Array(
            points
                .iter()
                .map(|[x, y]| Self::Array(vec![Self::Number(*x), Self::Number(*y)]))
                .collect(),
        )
    }

    /// Builds a polygon structure (`[ring, hole, ...]`).
    #[must_use]
    pub fn polygon(rings: &[&[[f64; 2]]]) -> Self {
        Self::Array(rings.iter().map(|ring| Self::line(ring)).collect())
    }

    /// Builds a multi-polygon structure (`[[ring, ...], [ring, ...]]`).
    #[must_use]
    pub fn multi_polygon(parts: &[&[&[[f64; 2]]]]) -> Self {
        Self::Array(parts.iter().map(|rings| Self::polygon(rings)).collect())
    }
}

/// Unique identifier of a boundary (the canton name or code).
///
/// Deserializes from either a JSON string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BoundaryId(String);

impl BoundaryId {
    /// Creates an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BoundaryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BoundaryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for BoundaryId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for BoundaryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Signed(value) => Self(value.to_string()),
            RawId::Unsigned(value) => Self(value.to_string()),
        })
    }
}

/// One administrative boundary (canton) of the boundary layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    /// Unique identifier within the layer.
    pub id: BoundaryId,
    /// Boundary area, in the unit the density is expressed per.
    /// `None` when the source had no usable value.
    pub area: Option<f64>,
    /// Raw polygon coordinates (single ring, polygon, or multi-polygon).
    pub coordinates: RawCoordinates,
}

/// One road segment of the road network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Raw category label (e.g. `"AUTOPISTA"`).
    pub category: String,
    /// Raw polyline coordinates (`[[x, y], ...]`).
    pub coordinates: RawCoordinates,
}

/// Property names used to read records out of `GeoJSON` features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerFieldMapping {
    /// Boundary property holding the unique identifier.
    pub boundary_id: String,
    /// Boundary property holding the area.
    pub boundary_area: String,
    /// Route property holding the category label.
    pub route_category: String,
}

impl Default for LayerFieldMapping {
    fn default() -> Self {
        Self {
            boundary_id: "canton".to_string(),
            boundary_area: "area".to_string(),
            route_category: "categoria".to_string(),
        }
    }
}

/// Which input layer a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// The boundary (polygon) layer.
    Boundary,
    /// The road network (polyline) layer.
    Route,
}

impl LayerKind {
    /// Returns the lowercase layer name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boundary => "boundary",
            Self::Route => "route",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature that was left out of a run, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFeature {
    /// Layer the feature came from.
    pub layer: LayerKind,
    /// Position of the feature within its layer.
    pub index: usize,
    /// Boundary identifier, when one was available.
    pub id: Option<String>,
    /// Description of what went wrong.
    pub reason: String,
}

impl fmt::Display for SkippedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(
                f,
                "{} #{} ({id}): {}",
                self.layer, self.index, self.reason
            ),
            None => write!(f, "{} #{}: {}", self.layer, self.index, self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_follows_geojson_nesting() {
        let ring: &[[f64; 2]] = &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        assert_eq!(RawCoordinates::Number(1.0).depth(), 0);
        assert_eq!(RawCoordinates::line(ring).depth(), 2);
        assert_eq!(RawCoordinates::polygon(&[ring]).depth(), 3);
        assert_eq!(RawCoordinates::multi_polygon(&[&[ring]]).depth(), 4);
        assert_eq!(RawCoordinates::Array(vec![]).depth(), 1);
    }

    #[test]
    fn coordinates_deserialize_from_nested_json() {
        let raw: RawCoordinates = serde_json::from_str("[[0, 0], [1.5, 2]]").unwrap();
        assert_eq!(raw, RawCoordinates::line(&[[0.0, 0.0], [1.5, 2.0]]));
    }

    #[test]
    fn non_numeric_coordinates_fail_to_deserialize() {
        assert!(serde_json::from_str::<RawCoordinates>(r#"[["a", 0]]"#).is_err());
    }

    #[test]
    fn boundary_id_accepts_strings_and_integers() {
        let text: BoundaryId = serde_json::from_str(r#""Escazu""#).unwrap();
        let number: BoundaryId = serde_json::from_str("102").unwrap();
        assert_eq!(text.as_str(), "Escazu");
        assert_eq!(number, BoundaryId::from(102));
    }

    #[test]
    fn field_mapping_defaults_fill_missing_keys() {
        let mapping: LayerFieldMapping =
            serde_json::from_str(r#"{ "boundary_id": "name" }"#).unwrap();
        assert_eq!(mapping.boundary_id, "name");
        assert_eq!(mapping.boundary_area, "area");
        assert_eq!(mapping.route_category, "categoria");
    }

    #[test]
    fn skipped_feature_display_includes_id() {
        let skipped = SkippedFeature {
            layer: LayerKind::Boundary,
            index: 3,
            id: Some("Mora".to_string()),
            reason: "empty ring".to_string(),
        };
        assert_eq!(skipped.to_string(), "boundary #3 (Mora): empty ring");
    }
}
