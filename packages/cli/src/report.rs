//! Plain-text rendering of engine results for the terminal.

use road_density_engine_models::{AggregateTable, Column, Ranking, RunSummary};
use road_density_road_models::{CategoryMapping, RoadCategory};

/// Every column a ranking can be based on, total first.
#[must_use]
pub fn columns() -> Vec<Column> {
    std::iter::once(Column::Total)
        .chain(RoadCategory::all().iter().map(|c| Column::Category(*c)))
        .collect()
}

/// Formats run statistics and every non-fatal problem.
#[must_use]
pub fn format_summary(summary: &RunSummary) -> String {
    let mut lines = vec![
        format!(
            "Boundaries: {} read, {} used",
            summary.boundaries_read, summary.boundaries_used
        ),
        format!(
            "Routes:     {} read, {} used",
            summary.routes_read, summary.routes_used
        ),
        format!(
            "Clip pass:  {} candidate pairs, {} clipped segments",
            summary.candidate_pairs, summary.clipped_segments
        ),
    ];

    if !summary.skipped.is_empty() {
        lines.push(format!("Skipped features ({}):", summary.skipped.len()));
        lines.extend(summary.skipped.iter().map(|s| format!("  {s}")));
    }
    if !summary.unknown_categories.is_empty() {
        lines.push("Unknown road categories (counted in totals only):".to_string());
        lines.extend(
            summary
                .unknown_categories
                .iter()
                .map(|(label, count)| {
                    let label = if label.is_empty() { "(no label)" } else { label };
                    format!("  {label}: {count} routes")
                }),
        );
    }
    if !summary.undefined_densities.is_empty() {
        let ids: Vec<&str> = summary
            .undefined_densities
            .iter()
            .map(|id| id.as_str())
            .collect();
        lines.push(format!(
            "Density undefined (zero or missing area): {}",
            ids.join(", ")
        ));
    }

    lines.join("\n")
}

/// Formats a ranking as a table followed by the remainder line.
#[must_use]
pub fn format_ranking(ranking: &Ranking) -> String {
    let width = ranking
        .top
        .iter()
        .map(|row| row.boundary_id.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max("Other boundaries".len());

    let mut lines = vec![
        format!("{} ({})", ranking.column.display_label(), ranking.column),
        format!("{:>3}  {:<width$}  {:>12}  {:>10}", "#", "Boundary", "km", "km/area"),
    ];
    lines.extend(ranking.top.iter().enumerate().map(|(i, row)| {
        format!(
            "{:>3}  {:<width$}  {:>12.3}  {:>10}",
            i + 1,
            row.boundary_id.as_str(),
            row.value,
            density(row.density)
        )
    }));
    lines.push(format!(
        "{:>3}  {:<width$}  {:>12.3}",
        "",
        "Other boundaries",
        ranking.others
    ));

    lines.join("\n")
}

/// Formats the density of `column` for every boundary, in identifier order.
#[must_use]
pub fn format_densities(table: &AggregateTable, column: Column) -> String {
    table
        .rows()
        .iter()
        .map(|row| {
            format!(
                "{}: {}",
                row.boundary_id,
                density(row.density_of(column))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats the category taxonomy and the labels mapped onto it.
#[must_use]
pub fn format_categories(mapping: &CategoryMapping) -> String {
    RoadCategory::all()
        .iter()
        .map(|category| {
            let labels: Vec<&str> = mapping
                .iter()
                .filter(|(_, c)| c == category)
                .map(|(label, _)| label)
                .collect();
            format!(
                "{:<16} {:<20} {:<26} {}",
                category.as_ref(),
                category.column_name(),
                category.display_label(),
                if labels.is_empty() {
                    "(no labels)".to_string()
                } else {
                    labels.join(" | ")
                }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn density(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use road_density_engine_models::AggregateRow;
    use road_density_layer_models::{BoundaryId, LayerKind, SkippedFeature};

    use super::*;

    fn table() -> AggregateTable {
        let row = |id: &str, area, km| {
            AggregateRow::new(
                BoundaryId::from(id),
                area,
                km,
                BTreeMap::from([(RoadCategory::DirtRoad, km)]),
            )
        };
        AggregateTable::from_rows(vec![
            row("Alajuela", Some(10.0), 50.0),
            row("Cartago", Some(5.0), 80.0),
            row("Escazu", Some(0.0), 20.0),
        ])
    }

    #[test]
    fn columns_start_with_total() {
        let columns = columns();
        assert_eq!(columns[0], Column::Total);
        assert_eq!(columns.len(), RoadCategory::all().len() + 1);
    }

    #[test]
    fn ranking_lists_top_then_others() {
        let text = format_ranking(&table().ranking(Column::Total, 2));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].contains("Cartago") && lines[2].contains("16.000"));
        assert!(lines[3].contains("Alajuela"));
        assert!(lines[4].contains("Other boundaries") && lines[4].ends_with("20.000"));
    }

    #[test]
    fn densities_mark_undefined_values() {
        let text = format_densities(&table(), Column::Category(RoadCategory::DirtRoad));
        assert_eq!(text, "Alajuela: 5.000\nCartago: 16.000\nEscazu: n/a");
    }

    #[test]
    fn summary_lists_problems() {
        let summary = RunSummary {
            boundaries_read: 3,
            boundaries_used: 2,
            skipped: vec![SkippedFeature {
                layer: LayerKind::Boundary,
                index: 2,
                id: Some("x".to_string()),
                reason: "duplicate identifier".to_string(),
            }],
            unknown_categories: BTreeMap::from([
                (String::new(), 2),
                ("SENDERO".to_string(), 4),
            ]),
            undefined_densities: vec![BoundaryId::from("Escazu")],
            ..RunSummary::default()
        };
        let text = format_summary(&summary);
        assert!(text.contains("boundary #2 (x): duplicate identifier"));
        assert!(text.contains("SENDERO: 4 routes"));
        assert!(text.contains("(no label): 2 routes"));
        assert!(text.ends_with("Escazu"));

        assert_eq!(format_summary(&RunSummary::default()).lines().count(), 3);
    }

    #[test]
    fn categories_show_default_labels() {
        let text = format_categories(&CategoryMapping::default());
        assert_eq!(text.lines().count(), RoadCategory::all().len());
        assert!(text.contains("highway_km"));
        assert!(text.contains("AUTOPISTA"));
        assert!(format_categories(&CategoryMapping::empty()).contains("(no labels)"));
    }
}
