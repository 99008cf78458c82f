//! Per-boundary summation of clipped road lengths.
//!
//! The [`Aggregator`] only ever adds, so partial results can be inspected
//! with [`Aggregator::snapshot`] while segments are still arriving, and two
//! aggregators over the same boundaries can be combined with
//! [`Aggregator::merge`].

use std::collections::BTreeMap;

use road_density_engine_models::{AggregateRow, AggregateTable};
use road_density_layer_models::BoundaryId;
use road_density_road_models::RoadCategory;

use crate::EngineError;
use crate::clip::ClippedSegment;
use crate::prepare::PreparedBoundary;
use crate::units::UnitConverter;

#[derive(Debug, Clone, Default, PartialEq)]
struct Sums {
    total: f64,
    categories: BTreeMap<RoadCategory, f64>,
}

/// Add-only accumulator of scaled lengths, one slot per boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    converter: UnitConverter,
    boundaries: Vec<(BoundaryId, Option<f64>)>,
    sums: Vec<Sums>,
    segments: u64,
}

impl Aggregator {
    /// Creates an empty accumulator for `boundaries`.
    #[must_use]
    pub fn new(boundaries: &[PreparedBoundary], converter: UnitConverter) -> Self {
        Self {
            converter,
            boundaries: boundaries.iter().map(|b| (b.id.clone(), b.area)).collect(),
            sums: vec![Sums::default(); boundaries.len()],
            segments: 0,
        }
    }

    /// Adds one clipped segment.
    ///
    /// Every segment counts towards its boundary's total. Only segments
    /// with a known category count towards a category.
    pub fn add(&mut self, segment: &ClippedSegment) {
        let Some(sums) = self.sums.get_mut(segment.boundary) else {
            log::warn!(
                "Ignoring segment for unknown boundary slot {}",
                segment.boundary
            );
            return;
        };

        let scaled = self.converter.scale(segment.length);
        sums.total += scaled;
        if let Some(category) = segment.category.known() {
            *sums.categories.entry(category).or_insert(0.0) += scaled;
        }
        self.segments += 1;
    }

    /// Folds `other` into `self`. Both must have been created for the same
    /// boundaries.
    pub fn merge(&mut self, other: Self) {
        for (mine, theirs) in self.sums.iter_mut().zip(other.sums) {
            mine.total += theirs.total;
            for (category, length) in theirs.categories {
                *mine.categories.entry(category).or_insert(0.0) += length;
            }
        }
        self.segments += other.segments;
    }

    /// Number of segments added so far.
    #[must_use]
    pub const fn segments(&self) -> u64 {
        self.segments
    }

    /// The table as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> AggregateTable {
        AggregateTable::from_rows(
            self.boundaries
                .iter()
                .zip(&self.sums)
                .map(|((id, area), sums)| self.row(id, *area, sums))
                .collect(),
        )
    }

    /// Final table plus the boundaries whose density is undefined, sorted
    /// by identifier.
    #[must_use]
    pub fn finish(self) -> (AggregateTable, Vec<BoundaryId>) {
        let table = self.snapshot();
        let undefined = table
            .rows()
            .iter()
            .filter_map(|row| {
                density(&row.boundary_id, row.area, row.total_length_km)
                    .err()
                    .map(|_| row.boundary_id.clone())
            })
            .collect();
        (table, undefined)
    }

    fn row(&self, id: &BoundaryId, area: Option<f64>, sums: &Sums) -> AggregateRow {
        let categories = sums
            .categories
            .iter()
            .map(|(category, scaled)| (*category, self.converter.group(*scaled)))
            .collect();
        AggregateRow::new(id.clone(), area, self.converter.group(sums.total), categories)
    }
}

/// Road length per unit of area for one boundary.
///
/// # Errors
///
/// Returns [`EngineError::DivisionUndefined`] if `area` is missing, zero,
/// negative or not finite.
pub fn density(
    boundary: &BoundaryId,
    area: Option<f64>,
    total: f64,
) -> Result<f64, EngineError> {
    road_density_engine_models::per_area(total, area).ok_or_else(|| {
        EngineError::DivisionUndefined {
            boundary: boundary.clone(),
        }
    })
}

/// Aggregates a batch of segments.
///
/// Segments are summed in (boundary, route) order whatever order they
/// are given in, so the result is reproducible bit for bit.
#[must_use]
pub fn aggregate(
    boundaries: &[PreparedBoundary],
    segments: &[ClippedSegment],
    converter: UnitConverter,
) -> (AggregateTable, Vec<BoundaryId>) {
    let mut ordered: Vec<&ClippedSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| (s.boundary, s.route));

    let mut aggregator = Aggregator::new(boundaries, converter);
    for segment in ordered {
        aggregator.add(segment);
    }
    aggregator.finish()
}
