#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Engine configuration and output types.
//!
//! The [`AggregateTable`] is the only contract presentation layers depend
//! on: one [`AggregateRow`] per boundary with its total clipped road
//! length, the length per [`RoadCategory`], and the resulting density.
//! Rows exist for every boundary, including those no road crosses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use road_density_layer_models::{BoundaryId, SkippedFeature};
use road_density_road_models::{CategoryMapping, RoadCategory};
use serde::{Deserialize, Serialize};

/// How clipped lengths are measured and converted to kilometres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LengthMode {
    /// Planar length in coordinate units (degrees) times a flat factor of
    /// 100. A linear approximation, not a true ground distance.
    #[default]
    Planar,
    /// Geodesic length on the WGS84 ellipsoid, converted from metres.
    Geodesic,
}

/// Which rings of a boundary geometry are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RingPolicy {
    /// Only the outer ring of the first part. Holes and further parts are
    /// dropped.
    #[default]
    FirstOuterRing,
    /// Every part with its holes.
    AllParts,
}

/// Tunables for a single engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length measurement mode.
    pub length_mode: LengthMode,
    /// Boundary ring selection.
    pub ring_policy: RingPolicy,
    /// Prune (boundary, route) pairs with an R-tree before the exact test.
    pub use_spatial_index: bool,
    /// Evaluate the clip pass across worker threads.
    pub parallel: bool,
    /// Raw road label to category table.
    pub categories: CategoryMapping,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            length_mode: LengthMode::default(),
            ring_policy: RingPolicy::default(),
            use_spatial_index: true,
            parallel: true,
            categories: CategoryMapping::default(),
        }
    }
}

/// Divides `length` by `area`.
///
/// Returns `None` when the area is missing, zero, negative or not finite.
#[must_use]
pub fn per_area(length: f64, area: Option<f64>) -> Option<f64> {
    area.filter(|a| a.is_finite() && *a > 0.0)
        .map(|a| length / a)
}

/// A column of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Total clipped length across all categories.
    Total,
    /// Clipped length of one category.
    Category(RoadCategory),
}

impl Column {
    /// Returns the output column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Total => "total_km",
            Self::Category(category) => category.column_name(),
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Total => "All roads",
            Self::Category(category) => category.display_label(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColumnError {
    /// The unrecognized input.
    pub value: String,
}

impl fmt::Display for InvalidColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown column '{}': expected TOTAL, a category name, or a column name",
            self.value
        )
    }
}

impl std::error::Error for InvalidColumnError {}

impl FromStr for Column {
    type Err = InvalidColumnError;

    /// Accepts `TOTAL`/`total_km`, a category name (`HIGHWAY`), or a
    /// category column name (`highway_km`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("total") || trimmed.eq_ignore_ascii_case(Self::Total.name())
        {
            return Ok(Self::Total);
        }
        RoadCategory::all()
            .iter()
            .find(|c| {
                trimmed.eq_ignore_ascii_case(c.as_ref())
                    || trimmed.eq_ignore_ascii_case(c.column_name())
            })
            .map(|c| Self::Category(*c))
            .ok_or_else(|| InvalidColumnError {
                value: trimmed.to_string(),
            })
    }
}

/// Aggregated road lengths for one boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    /// Boundary identifier.
    pub boundary_id: BoundaryId,
    /// Boundary area as given in the input layer.
    pub area: Option<f64>,
    /// Clipped length over every category, unknown labels included.
    pub total_length_km: f64,
    /// Clipped length per category. Holds every [`RoadCategory`].
    pub category_lengths_km: BTreeMap<RoadCategory, f64>,
    /// `total_length_km / area`, `None` when the area is zero or missing.
    pub density: Option<f64>,
}

impl AggregateRow {
    /// Creates a row, filling absent categories with zero and deriving the
    /// density from the total.
    #[must_use]
    pub fn new(
        boundary_id: BoundaryId,
        area: Option<f64>,
        total_length_km: f64,
        mut category_lengths_km: BTreeMap<RoadCategory, f64>,
    ) -> Self {
        for category in RoadCategory::all() {
            category_lengths_km.entry(*category).or_insert(0.0);
        }
        Self {
            density: per_area(total_length_km, area),
            boundary_id,
            area,
            total_length_km,
            category_lengths_km,
        }
    }

    /// Creates the row of a boundary no road crosses.
    #[must_use]
    pub fn empty(boundary_id: BoundaryId, area: Option<f64>) -> Self {
        Self::new(boundary_id, area, 0.0, BTreeMap::new())
    }

    /// Returns the length in `column`.
    #[must_use]
    pub fn value(&self, column: Column) -> f64 {
        match column {
            Column::Total => self.total_length_km,
            Column::Category(category) => self.category_length(category),
        }
    }

    /// Returns the clipped length of one category.
    #[must_use]
    pub fn category_length(&self, category: RoadCategory) -> f64 {
        self.category_lengths_km
            .get(&category)
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the length in `column` divided by the boundary area.
    #[must_use]
    pub fn density_of(&self, column: Column) -> Option<f64> {
        per_area(self.value(column), self.area)
    }

    /// Sum of the named category lengths. Equals the total when every
    /// contributing road had a known category.
    #[must_use]
    pub fn category_sum(&self) -> f64 {
        self.category_lengths_km.values().sum()
    }
}

/// One entry of a [`Ranking`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRow {
    /// Boundary identifier.
    pub boundary_id: BoundaryId,
    /// Length in the ranked column.
    pub value: f64,
    /// Density of the ranked column.
    pub density: Option<f64>,
}

/// The top boundaries by one column, plus everything else summed up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    /// Column the ranking is based on.
    pub column: Column,
    /// Boundaries with the greatest values, descending.
    pub top: Vec<RankedRow>,
    /// Summed value of all boundaries not in `top`.
    pub others: f64,
}

/// The engine's output: one row per boundary, sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateTable {
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Builds a table, sorting rows by boundary identifier.
    #[must_use]
    pub fn from_rows(mut rows: Vec<AggregateRow>) -> Self {
        rows.sort_by(|a, b| a.boundary_id.cmp(&b.boundary_id));
        Self { rows }
    }

    /// Returns all rows.
    #[must_use]
    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the row of one boundary.
    #[must_use]
    pub fn get(&self, id: &BoundaryId) -> Option<&AggregateRow> {
        self.rows
            .binary_search_by(|row| row.boundary_id.cmp(id))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Sums `column` over every row.
    #[must_use]
    pub fn column_total(&self, column: Column) -> f64 {
        self.rows.iter().map(|row| row.value(column)).sum()
    }

    /// Ranks boundaries by `column`, keeping the `limit` greatest.
    ///
    /// Ties are broken by boundary identifier so the result does not depend
    /// on row order.
    #[must_use]
    pub fn ranking(&self, column: Column, limit: usize) -> Ranking {
        let mut ordered: Vec<&AggregateRow> = self.rows.iter().collect();
        ordered.sort_by(|a, b| {
            b.value(column)
                .total_cmp(&a.value(column))
                .then_with(|| a.boundary_id.cmp(&b.boundary_id))
        });

        let split = limit.min(ordered.len());
        let others = ordered[split..].iter().map(|row| row.value(column)).sum();
        let top = ordered[..split]
            .iter()
            .map(|row| RankedRow {
                boundary_id: row.boundary_id.clone(),
                value: row.value(column),
                density: row.density_of(column),
            })
            .collect();

        Ranking {
            column,
            top,
            others,
        }
    }
}

/// Statistics and non-fatal problems of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Boundary features handed to the engine.
    pub boundaries_read: usize,
    /// Route features handed to the engine.
    pub routes_read: usize,
    /// Boundaries that produced a valid polygon.
    pub boundaries_used: usize,
    /// Routes that produced a valid polyline.
    pub routes_used: usize,
    /// Features left out, in input order per layer.
    pub skipped: Vec<SkippedFeature>,
    /// Labels not in the category table, with their number of routes.
    pub unknown_categories: BTreeMap<String, u64>,
    /// Boundaries whose density could not be computed.
    pub undefined_densities: Vec<BoundaryId>,
    /// (boundary, route) pairs tested exactly.
    pub candidate_pairs: u64,
    /// Intersecting pairs, each producing one clipped segment.
    pub clipped_segments: u64,
}

impl RunSummary {
    /// Returns `true` if anything was skipped or could not be classified.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.skipped.is_empty()
            || !self.unknown_categories.is_empty()
            || !self.undefined_densities.is_empty()
    }

    /// Adds features skipped before the engine saw them (e.g. at load time).
    pub fn extend_skipped(&mut self, skipped: impl IntoIterator<Item = SkippedFeature>) {
        self.skipped.extend(skipped);
        self.skipped.sort_by(|a, b| (a.layer, a.index).cmp(&(b.layer, b.index)));
    }
}
