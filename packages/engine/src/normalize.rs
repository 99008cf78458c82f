//! Converts raw nested coordinate arrays into polygons and polylines.
//!
//! Boundary geometries arrive as a bare ring, a polygon (`[ring, hole, ..]`)
//! or a multi-polygon (`[[ring, ..], [ring, ..]]`). The nesting depth is
//! detected from the structure itself. Under [`RingPolicy::FirstOuterRing`]
//! only the outer ring of the first part is used, so holes and additional
//! parts are lost.

use geo::{Area, Coord, LineString, MultiPolygon, Polygon};
use road_density_engine_models::RingPolicy;
use road_density_layer_models::RawCoordinates;

use crate::EngineError;

/// Which kind of feature a coordinate structure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// Polygon of the boundary layer.
    Boundary,
    /// Polyline of the road network layer.
    Route,
}

/// Flattens a raw coordinate structure into an ordered coordinate sequence.
///
/// For routes the structure must already be a flat list of positions. For
/// boundaries the outer ring of the first part is selected.
///
/// # Errors
///
/// Returns [`EngineError::InvalidGeometry`] if the structure is empty, has
/// an unexpected nesting depth, or contains positions with fewer than two
/// finite numbers.
pub fn normalize_coordinates(
    raw: &RawCoordinates,
    kind: GeometryKind,
) -> Result<Vec<Coord<f64>>, EngineError> {
    match kind {
        GeometryKind::Route => match raw.depth() {
            2 => positions(raw),
            depth => Err(invalid(format!(
                "expected a flat list of positions for a route, found nesting depth {depth}"
            ))),
        },
        GeometryKind::Boundary => positions(outer_ring(raw)?),
    }
}

/// Builds the polyline of a route.
///
/// # Errors
///
/// Returns [`EngineError::InvalidGeometry`] if the coordinates are malformed
/// or all positions coincide.
pub fn route_line(raw: &RawCoordinates) -> Result<LineString<f64>, EngineError> {
    let mut coords = normalize_coordinates(raw, GeometryKind::Route)?;
    coords.dedup();
    if coords.len() < 2 {
        return Err(invalid("route has fewer than two distinct positions"));
    }
    Ok(LineString::new(coords))
}

/// Builds the polygon geometry of a boundary according to `policy`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidGeometry`] if a kept ring is malformed or
/// the outer ring encloses no area.
pub fn boundary_shape(
    raw: &RawCoordinates,
    policy: RingPolicy,
) -> Result<MultiPolygon<f64>, EngineError> {
    let polygons = match policy {
        RingPolicy::FirstOuterRing => {
            let exterior = ring(normalize_coordinates(raw, GeometryKind::Boundary)?)?;
            vec![Polygon::new(exterior, vec![])]
        }
        RingPolicy::AllParts => parts(raw)?
            .into_iter()
            .map(polygon_from_rings)
            .collect::<Result<Vec<_>, _>>()?,
    };

    let shape = MultiPolygon::new(polygons);
    if shape.unsigned_area() <= 0.0 {
        return Err(invalid("boundary ring encloses no area"));
    }
    Ok(shape)
}

/// Selects the outer ring of the first part.
fn outer_ring(raw: &RawCoordinates) -> Result<&RawCoordinates, EngineError> {
    match raw.depth() {
        2 => Ok(raw),
        3 => first(raw),
        4 => first(first(raw)?),
        depth => Err(invalid(format!(
            "unsupported nesting depth {depth} for a boundary"
        ))),
    }
}

/// Splits a boundary structure into parts, each a list of rings.
fn parts(raw: &RawCoordinates) -> Result<Vec<Vec<&RawCoordinates>>, EngineError> {
    match raw.depth() {
        2 => Ok(vec![vec![raw]]),
        3 => Ok(vec![items(raw)?.iter().collect()]),
        4 => items(raw)?
            .iter()
            .map(|part| items(part).map(|rings| rings.iter().collect::<Vec<_>>()))
            .collect(),
        depth => Err(invalid(format!(
            "unsupported nesting depth {depth} for a boundary"
        ))),
    }
}

fn polygon_from_rings(rings: Vec<&RawCoordinates>) -> Result<Polygon<f64>, EngineError> {
    let mut rings = rings.into_iter().map(|r| positions(r).and_then(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| invalid("polygon part has no rings"))??;
    let holes = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, holes))
}

/// Validates a ring and closes it.
fn ring(mut coords: Vec<Coord<f64>>) -> Result<LineString<f64>, EngineError> {
    coords.dedup();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Err(invalid("ring has fewer than three distinct positions"));
    }
    coords.push(coords[0]);
    Ok(LineString::new(coords))
}

/// Reads a flat list of positions, keeping x and y of each.
fn positions(raw: &RawCoordinates) -> Result<Vec<Coord<f64>>, EngineError> {
    let items = items(raw)?;
    items
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let values = position
                .as_array()
                .ok_or_else(|| invalid(format!("position {i} is not an array")))?;
            match values {
                [x, y, ..] => match (x.as_number(), y.as_number()) {
                    (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
                    _ => Err(invalid(format!("position {i} has non-finite components"))),
                },
                _ => Err(invalid(format!("position {i} has fewer than two components"))),
            }
        })
        .collect()
}

fn items(raw: &RawCoordinates) -> Result<&[RawCoordinates], EngineError> {
    match raw.as_array() {
        Some([]) => Err(invalid("empty coordinate array")),
        Some(items) => Ok(items),
        None => Err(invalid("expected a coordinate array, found a number")),
    }
}

fn first(raw: &RawCoordinates) -> Result<&RawCoordinates, EngineError> {
    Ok(&items(raw)?[0])
}

fn invalid(reason: impl Into<String>) -> EngineError {
    EngineError::InvalidGeometry {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &[[f64; 2]] = &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
    const HOLE: &[[f64; 2]] = &[[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.25]];
    const FAR: &[[f64; 2]] = &[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]];

    fn assert_invalid<T: std::fmt::Debug>(result: Result<T, EngineError>) {
        assert!(
            matches!(result, Err(EngineError::InvalidGeometry { .. })),
            "expected InvalidGeometry, got {result:?}"
        );
    }

    #[test]
    fn route_is_already_flat() {
        let raw = RawCoordinates::line(&[[0.5, -1.0], [0.5, 2.0]]);
        let coords = normalize_coordinates(&raw, GeometryKind::Route).unwrap();
        assert_eq!(coords, vec![Coord { x: 0.5, y: -1.0 }, Coord { x: 0.5, y: 2.0 }]);
    }

    #[test]
    fn single_ring_boundary() {
        let raw = RawCoordinates::polygon(&[SQUARE]);
        let coords = normalize_coordinates(&raw, GeometryKind::Boundary).unwrap();
        assert_eq!(coords.len(), SQUARE.len());
        assert_eq!(coords[1], Coord { x: 1.0, y: 0.0 });
    }

    #[test]
    fn multi_part_boundary_uses_outer_ring_of_first_part() {
        let raw = RawCoordinates::multi_polygon(&[&[SQUARE, HOLE], &[FAR]]);
        let coords = normalize_coordinates(&raw, GeometryKind::Boundary).unwrap();
        assert_eq!(coords.len(), SQUARE.len());
        assert!(coords.iter().all(|c| c.x <= 1.0 && c.y <= 1.0));
    }

    #[test]
    fn first_outer_ring_policy_drops_holes_and_parts() {
        let raw = RawCoordinates::multi_polygon(&[&[SQUARE, HOLE], &[FAR]]);
        let shape = boundary_shape(&raw, RingPolicy::FirstOuterRing).unwrap();
        assert_eq!(shape.0.len(), 1);
        assert!(shape.0[0].interiors().is_empty());
        assert!((shape.unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_parts_policy_keeps_holes_and_parts() {
        let raw = RawCoordinates::multi_polygon(&[&[SQUARE, HOLE], &[FAR]]);
        let shape = boundary_shape(&raw, RingPolicy::AllParts).unwrap();
        assert_eq!(shape.0.len(), 2);
        assert_eq!(shape.0[0].interiors().len(), 1);
        assert!((shape.unsigned_area() - (1.0 - 0.125 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn open_ring_is_closed() {
        let raw = RawCoordinates::polygon(&[&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]);
        let shape = boundary_shape(&raw, RingPolicy::FirstOuterRing).unwrap();
        let exterior = shape.0[0].exterior();
        assert_eq!(exterior.0.first(), exterior.0.last());
        assert_eq!(exterior.0.len(), 4);
    }

    #[test]
    fn empty_arrays_are_invalid() {
        assert_invalid(normalize_coordinates(
            &RawCoordinates::Array(vec![]),
            GeometryKind::Route,
        ));
        assert_invalid(normalize_coordinates(
            &RawCoordinates::Array(vec![RawCoordinates::Array(vec![])]),
            GeometryKind::Boundary,
        ));
    }

    #[test]
    fn short_positions_are_invalid() {
        let raw = RawCoordinates::Array(vec![
            RawCoordinates::Array(vec![RawCoordinates::Number(1.0)]),
            RawCoordinates::Array(vec![RawCoordinates::Number(2.0)]),
        ]);
        assert_invalid(normalize_coordinates(&raw, GeometryKind::Route));
    }

    #[test]
    fn nested_route_is_invalid() {
        let raw = RawCoordinates::polygon(&[SQUARE]);
        assert_invalid(normalize_coordinates(&raw, GeometryKind::Route));
    }

    #[test]
    fn degenerate_geometries_are_invalid() {
        assert_invalid(route_line(&RawCoordinates::line(&[[1.0, 1.0], [1.0, 1.0]])));
        assert_invalid(boundary_shape(
            &RawCoordinates::polygon(&[&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]),
            RingPolicy::FirstOuterRing,
        ));
        assert_invalid(boundary_shape(
            &RawCoordinates::polygon(&[&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]]),
            RingPolicy::FirstOuterRing,
        ));
    }

    #[test]
    fn extra_position_components_are_ignored() {
        let raw = RawCoordinates::Array(vec![
            RawCoordinates::Array(vec![
                RawCoordinates::Number(0.0),
                RawCoordinates::Number(0.0),
                RawCoordinates::Number(1200.0),
            ]),
            RawCoordinates::Array(vec![
                RawCoordinates::Number(1.0),
                RawCoordinates::Number(0.0),
                RawCoordinates::Number(1250.0),
            ]),
        ]);
        let line = route_line(&raw).unwrap();
        assert_eq!(line.0.len(), 2);
    }
}
