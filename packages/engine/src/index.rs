//! R-tree over boundary bounding boxes.
//!
//! Used to prune (boundary, route) pairs whose envelopes are disjoint
//! before the exact intersection test. Pruning only removes pairs that
//! cannot intersect, so results are identical with or without the index.

use geo::{BoundingRect, Rect};
use rstar::{AABB, RTree, RTreeObject};

use crate::prepare::PreparedBoundary;

/// A boundary envelope stored in the R-tree, pointing back at its slot in
/// the prepared boundary list.
struct BoundaryEntry {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over a slice of prepared boundaries.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Bulk-loads the envelopes of `boundaries`.
    #[must_use]
    pub fn build(boundaries: &[PreparedBoundary]) -> Self {
        let entries = boundaries
            .iter()
            .enumerate()
            .map(|(slot, boundary)| BoundaryEntry {
                slot,
                envelope: boundary.envelope,
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Slots of the boundaries whose envelope intersects `envelope`, in
    /// ascending order.
    #[must_use]
    pub fn candidates(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        slots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Bounding box of a geometry as an R-tree envelope.
///
/// Returns `None` for empty geometries.
pub fn compute_envelope<G: BoundingRect<f64>>(geometry: &G) -> Option<AABB<[f64; 2]>> {
    let rect: Option<Rect<f64>> = geometry.bounding_rect().into();
    rect.map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}

#[cfg(test)]
mod tests {
    use geo::{LineString, MultiPolygon, Polygon};
    use road_density_layer_models::BoundaryId;

    use super::*;

    fn square(slot: usize, x: f64, y: f64) -> PreparedBoundary {
        let shape = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + 1.0, y),
                (x + 1.0, y + 1.0),
                (x, y + 1.0),
                (x, y),
            ]),
            vec![],
        )]);
        PreparedBoundary {
            index: slot,
            id: BoundaryId::from(format!("b{slot}")),
            area: Some(1.0),
            envelope: compute_envelope(&shape).unwrap(),
            shape,
        }
    }

    #[test]
    fn candidates_are_envelope_hits_in_slot_order() {
        let boundaries: Vec<PreparedBoundary> = (0..10u32)
            .enumerate()
            .map(|(slot, i)| square(slot, f64::from(i) * 2.0, 0.0))
            .collect();
        let index = BoundaryIndex::build(&boundaries);
        assert_eq!(index.len(), 10);

        let query = AABB::from_corners([2.5, 0.5], [6.5, 0.6]);
        assert_eq!(index.candidates(&query), vec![1, 2, 3]);
    }

    #[test]
    fn touching_envelopes_are_candidates() {
        let index = BoundaryIndex::build(&[square(0, 0.0, 0.0)]);
        let query = AABB::from_corners([1.0, 1.0], [2.0, 2.0]);
        assert_eq!(index.candidates(&query), vec![0]);
    }

    #[test]
    fn disjoint_query_has_no_candidates() {
        let index = BoundaryIndex::build(&[square(0, 0.0, 0.0)]);
        let query = AABB::from_corners([5.0, 5.0], [6.0, 6.0]);
        assert!(index.candidates(&query).is_empty());
    }

    #[test]
    fn empty_geometry_has_no_envelope() {
        let empty: LineString<f64> = LineString::new(vec![]);
        assert!(compute_envelope(&empty).is_none());
        assert!(BoundaryIndex::build(&[]).is_empty());
    }
}
