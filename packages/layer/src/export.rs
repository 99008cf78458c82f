//! Writers for the aggregate table and the clipped road geometry.

use std::io::Write;

use geojson::{Feature, FeatureCollection, JsonObject};
use road_density_engine::clip::ClippedSegment;
use road_density_engine::prepare::{PreparedBoundary, PreparedRoute};
use road_density_engine::units::UnitConverter;
use road_density_engine_models::AggregateTable;
use road_density_road_models::{CategoryTag, RoadCategory};

use crate::LayerError;

/// Writes the table as CSV.
///
/// Columns are `boundary`, `area`, `total_km`, one column per
/// [`RoadCategory`] and `density`. Missing areas and undefined densities
/// are written as empty cells.
///
/// # Errors
///
/// Returns [`LayerError`] if writing fails.
pub fn write_table_csv<W: Write>(writer: W, table: &AggregateTable) -> Result<(), LayerError> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["boundary", "area", "total_km"];
    header.extend(RoadCategory::all().iter().map(|c| c.column_name()));
    header.push("density");
    csv.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![
            row.boundary_id.to_string(),
            optional(row.area),
            row.total_length_km.to_string(),
        ];
        record.extend(
            RoadCategory::all()
                .iter()
                .map(|c| row.category_length(*c).to_string()),
        );
        record.push(optional(row.density));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the table as a pretty-printed JSON array of rows.
///
/// # Errors
///
/// Returns [`LayerError`] if serialization or writing fails.
pub fn write_table_json<W: Write>(writer: W, table: &AggregateTable) -> Result<(), LayerError> {
    serde_json::to_writer_pretty(writer, table)?;
    Ok(())
}

/// Builds a `FeatureCollection` of clipped segments.
///
/// Each feature carries the `boundary` identifier, the `category` (the
/// category name, or the raw label if unmapped), the `route` and
/// `length_km`. `route` is the route's position in the source file, taken
/// from `route_positions` (see [`LoadedLayer::positions`]); routes without
/// an entry keep their record index. With `filter` set only segments of
/// that category are included.
///
/// [`LoadedLayer::positions`]: crate::LoadedLayer::positions
#[must_use]
pub fn segments_to_geojson(
    segments: &[ClippedSegment],
    boundaries: &[PreparedBoundary],
    routes: &[PreparedRoute],
    route_positions: &[usize],
    filter: Option<RoadCategory>,
    converter: UnitConverter,
) -> FeatureCollection {
    let features = segments
        .iter()
        .filter(|s| filter.is_none_or(|wanted| s.category.known() == Some(wanted)))
        .filter_map(|segment| {
            let boundary = boundaries.get(segment.boundary)?;
            let route = routes.get(segment.route)?;

            let mut properties = JsonObject::new();
            properties.insert("boundary".to_string(), boundary.id.as_str().into());
            properties.insert("category".to_string(), category_name(&segment.category).into());
            let position = route_positions
                .get(route.index)
                .copied()
                .unwrap_or(route.index);
            properties.insert("route".to_string(), position.into());
            properties.insert(
                "length_km".to_string(),
                converter.to_km(segment.length).into(),
            );

            let geometry: geo::Geometry<f64> = segment.geometry.clone().into();
            Some(Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn category_name(tag: &CategoryTag) -> String {
    match tag {
        CategoryTag::Known(category) => category.to_string(),
        CategoryTag::Unknown(label) => label.clone(),
    }
}
