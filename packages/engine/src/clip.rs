//! Pairwise intersection of boundaries and routes.
//!
//! Every (boundary, route) pair whose geometries intersect produces one
//! [`ClippedSegment`]: the part of the route inside the boundary. A route
//! that only touches a boundary yields a zero-length [`ClippedGeometry::Touch`].
//!
//! Pairs are independent, so the pass can run across worker threads. The
//! resulting segments are sorted by (boundary slot, route slot), which keeps
//! downstream sums identical regardless of scheduling.

use geo::{
    BooleanOps, Euclidean, Geometry, Intersects, Length, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point,
};
use rayon::prelude::*;
use road_density_engine_models::EngineConfig;
use road_density_road_models::CategoryTag;

use crate::index::BoundaryIndex;
use crate::prepare::{PreparedBoundary, PreparedRoute};
use crate::progress::ProgressCallback;
use crate::units::UnitConverter;

/// Geometry of the part of a route lying within a boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ClippedGeometry {
    /// One or more pieces of positive length.
    Lines(MultiLineString<f64>),
    /// The route only touches the boundary at these points.
    Touch(MultiPoint<f64>),
}

impl ClippedGeometry {
    /// Native length of the geometry. Always zero for a touch.
    #[must_use]
    pub fn measure(&self, converter: UnitConverter) -> f64 {
        match self {
            Self::Lines(lines) => converter.measure(lines),
            Self::Touch(_) => 0.0,
        }
    }
}

impl From<ClippedGeometry> for Geometry<f64> {
    fn from(clipped: ClippedGeometry) -> Self {
        match clipped {
            ClippedGeometry::Lines(lines) => Self::MultiLineString(lines),
            ClippedGeometry::Touch(points) => Self::MultiPoint(points),
        }
    }
}

/// The part of one route inside one boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedSegment {
    /// Slot of the boundary in the prepared boundary list.
    pub boundary: usize,
    /// Slot of the route in the prepared route list.
    pub route: usize,
    pub category: CategoryTag,
    pub geometry: ClippedGeometry,
    /// Native length (see [`UnitConverter::measure`]).
    pub length: f64,
}

/// Output of [`clip_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipPass {
    /// Clipped segments sorted by (boundary, route).
    pub segments: Vec<ClippedSegment>,
    /// Pairs that went through the exact intersection test.
    pub candidate_pairs: u64,
}

/// Clips one route to one boundary.
///
/// Returns `None` if the geometries do not intersect.
#[must_use]
pub fn clip_pair(boundary: &PreparedBoundary, route: &PreparedRoute) -> Option<ClippedGeometry> {
    if !boundary.shape.intersects(&route.line) {
        return None;
    }

    let mut inside = boundary
        .shape
        .clip(&MultiLineString::new(vec![route.line.clone()]), false);
    inside
        .0
        .retain(|line| line.0.len() >= 2 && Euclidean.length(line) > 0.0);

    if inside.0.is_empty() {
        Some(ClippedGeometry::Touch(touch_points(
            &boundary.shape,
            &route.line,
        )))
    } else {
        Some(ClippedGeometry::Lines(inside))
    }
}

/// Points shared by a polygon and a line that meet without overlapping.
fn touch_points(shape: &MultiPolygon<f64>, line: &LineString<f64>) -> MultiPoint<f64> {
    let mut points: Vec<Point<f64>> = line.points().filter(|p| shape.intersects(p)).collect();
    points.extend(
        shape
            .iter()
            .flat_map(|polygon| polygon.exterior().points())
            .filter(|p| line.intersects(p)),
    );
    points.sort_by(|a, b| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y())));
    points.dedup();
    MultiPoint::new(points)
}

/// Clips every route against every boundary it may intersect.
///
/// With `config.use_spatial_index` only pairs with intersecting envelopes
/// are tested. With `config.parallel` routes are processed on the rayon
/// thread pool. Neither setting changes the result.
#[must_use]
pub fn clip_all(
    boundaries: &[PreparedBoundary],
    routes: &[PreparedRoute],
    config: &EngineConfig,
    progress: &dyn ProgressCallback,
) -> ClipPass {
    let converter = UnitConverter::new(config.length_mode);
    let index = config
        .use_spatial_index
        .then(|| BoundaryIndex::build(boundaries));

    progress.set_total(routes.len() as u64);
    progress.set_message(format!(
        "Clipping {} routes against {} boundaries",
        routes.len(),
        boundaries.len()
    ));

    let clip_route = |(slot, route): (usize, &PreparedRoute)| {
        let candidates: Vec<usize> = index.as_ref().map_or_else(
            || (0..boundaries.len()).collect(),
            |index| index.candidates(&route.envelope),
        );

        let segments: Vec<ClippedSegment> = candidates
            .iter()
            .filter_map(|&b| {
                clip_pair(&boundaries[b], route).map(|geometry| ClippedSegment {
                    boundary: b,
                    route: slot,
                    category: route.category.clone(),
                    length: geometry.measure(converter),
                    geometry,
                })
            })
            .collect();

        progress.inc(1);
        (segments, candidates.len() as u64)
    };

    let per_route: Vec<(Vec<ClippedSegment>, u64)> = if config.parallel {
        routes.par_iter().enumerate().map(clip_route).collect()
    } else {
        routes.iter().enumerate().map(clip_route).collect()
    };

    let mut pass = ClipPass::default();
    for (segments, candidates) in per_route {
        pass.segments.extend(segments);
        pass.candidate_pairs += candidates;
    }
    pass.segments.sort_by_key(|s| (s.boundary, s.route));

    progress.finish(format!(
        "Clipped {} segments from {} candidate pairs",
        pass.segments.len(),
        pass.candidate_pairs
    ));

    pass
}

#[cfg(test)]
mod tests {
    use geo::Polygon;
    use road_density_engine_models::LengthMode;
    use road_density_layer_models::BoundaryId;
    use road_density_road_models::RoadCategory;

    use super::*;
    use crate::index::compute_envelope;
    use crate::progress::NullProgress;

    fn boundary(x: f64, y: f64, size: f64) -> PreparedBoundary {
        let shape = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
                (x, y),
            ]),
            vec![],
        )]);
        PreparedBoundary {
            index: 0,
            id: BoundaryId::from(format!("{x},{y}")),
            area: Some(size * size),
            envelope: compute_envelope(&shape).unwrap(),
            shape,
        }
    }

    fn route(points: &[(f64, f64)]) -> PreparedRoute {
        let line = LineString::from(points.to_vec());
        PreparedRoute {
            index: 0,
            category: CategoryTag::Known(RoadCategory::Highway),
            envelope: compute_envelope(&line).unwrap(),
            line,
        }
    }

    fn planar() -> UnitConverter {
        UnitConverter::new(LengthMode::Planar)
    }

    #[test]
    fn crossing_route_is_cut_at_the_boundary() {
        let clipped = clip_pair(
            &boundary(0.0, 0.0, 1.0),
            &route(&[(0.5, -1.0), (0.5, 2.0)]),
        )
        .unwrap();
        assert!(matches!(clipped, ClippedGeometry::Lines(_)));
        assert!((clipped.measure(planar()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn vertex_touch_has_zero_length() {
        let clipped = clip_pair(
            &boundary(0.0, 0.0, 1.0),
            &route(&[(1.0, 1.0), (2.0, 2.0)]),
        )
        .unwrap();
        let ClippedGeometry::Touch(points) = &clipped else {
            panic!("expected a touch, got {clipped:?}");
        };
        assert_eq!(points.0, vec![Point::new(1.0, 1.0)]);
        assert!(clipped.measure(planar()).abs() < f64::EPSILON);
    }

    #[test]
    fn route_inside_keeps_its_full_length() {
        let r = route(&[(0.1, 0.1), (0.4, 0.5), (0.9, 0.5)]);
        let clipped = clip_pair(&boundary(0.0, 0.0, 1.0), &r).unwrap();
        let raw = planar().measure([&r.line]);
        assert!((clipped.measure(planar()) - raw).abs() < 1e-9);
    }

    #[test]
    fn route_outside_produces_nothing() {
        let clipped = clip_pair(&boundary(0.0, 0.0, 1.0), &route(&[(2.0, 2.0), (3.0, 2.0)]));
        assert!(clipped.is_none());
    }

    #[test]
    fn route_leaving_and_reentering_is_split() {
        let b = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (3.0, 0.0),
                (3.0, 3.0),
                (2.0, 3.0),
                (2.0, 1.0),
                (1.0, 1.0),
                (1.0, 3.0),
                (0.0, 3.0),
                (0.0, 0.0),
            ]),
            vec![],
        )]);
        let prepared = PreparedBoundary {
            index: 0,
            id: BoundaryId::from("u"),
            area: Some(7.0),
            envelope: compute_envelope(&b).unwrap(),
            shape: b,
        };
        let clipped = clip_pair(&prepared, &route(&[(-1.0, 2.0), (4.0, 2.0)])).unwrap();
        let ClippedGeometry::Lines(lines) = &clipped else {
            panic!("expected lines, got {clipped:?}");
        };
        assert!(lines.0.len() >= 2, "{lines:?}");
        assert!((clipped.measure(planar()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn index_and_threads_do_not_change_the_pass() {
        let boundaries: Vec<PreparedBoundary> = (0..5u32)
            .flat_map(|i| (0..5u32).map(move |j| boundary(f64::from(i), f64::from(j), 1.0)))
            .collect();
        let routes: Vec<PreparedRoute> = (0..12u32)
            .map(|i| {
                let t = f64::from(i) * 0.4;
                route(&[(t, -0.2), (t + 0.3, 2.6), (5.2 - t, 4.9)])
            })
            .collect();

        let brute = clip_all(
            &boundaries,
            &routes,
            &EngineConfig {
                use_spatial_index: false,
                parallel: false,
                ..EngineConfig::default()
            },
            &NullProgress,
        );
        let indexed = clip_all(&boundaries, &routes, &EngineConfig::default(), &NullProgress);

        assert_eq!(brute.segments, indexed.segments);
        assert_eq!(brute.candidate_pairs, 25 * 12);
        assert!(indexed.candidate_pairs < brute.candidate_pairs);

        let keys: Vec<(usize, usize)> = indexed
            .segments
            .iter()
            .map(|s| (s.boundary, s.route))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}
