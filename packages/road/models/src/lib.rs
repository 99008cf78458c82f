#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road surface category taxonomy.
//!
//! This crate defines the fixed set of road categories that clipped road
//! lengths are aggregated into, plus the explicit table that maps the raw
//! category labels found in the road network layer onto that set. Internal
//! category identity never depends on a display string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fixed road surface classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RoadCategory {
    /// Unpaved road carrying traffic in both directions
    UnpavedTwoWay,
    /// Paved single-lane road
    PavedOneWay,
    /// Paved road with two or more lanes
    PavedMultiWay,
    /// Dirt track
    DirtRoad,
    /// Controlled-access highway
    Highway,
}

impl RoadCategory {
    /// Returns all variants of this enum, in output column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::UnpavedTwoWay,
            Self::PavedOneWay,
            Self::PavedMultiWay,
            Self::DirtRoad,
            Self::Highway,
        ]
    }

    /// Returns the label this category carries in the road network layer.
    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::UnpavedTwoWay => "CARRETERA SIN PAVIMENTO DOS VIAS",
            Self::PavedOneWay => "CARRETERA PAVIMENTO UNA VIA",
            Self::PavedMultiWay => "CARRETERA PAVIMENTO DOS VIAS O MAS",
            Self::DirtRoad => "CAMINO DE TIERRA",
            Self::Highway => "AUTOPISTA",
        }
    }

    /// Returns the output table column holding this category's length.
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::UnpavedTwoWay => "unpaved_two_way_km",
            Self::PavedOneWay => "paved_one_way_km",
            Self::PavedMultiWay => "paved_multi_way_km",
            Self::DirtRoad => "dirt_road_km",
            Self::Highway => "highway_km",
        }
    }

    /// Returns a human-readable label for presentation layers.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::UnpavedTwoWay => "Unpaved, two-way",
            Self::PavedOneWay => "Paved, one lane",
            Self::PavedMultiWay => "Paved, two or more lanes",
            Self::DirtRoad => "Dirt roads",
            Self::Highway => "Highways",
        }
    }
}

/// Result of classifying a raw category label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTag {
    /// The label maps to one of the fixed categories.
    Known(RoadCategory),
    /// The label is not in the mapping table. Such segments only count
    /// towards a boundary's total length.
    Unknown(String),
}

impl CategoryTag {
    /// Returns the known category, if any.
    #[must_use]
    pub const fn known(&self) -> Option<RoadCategory> {
        match self {
            Self::Known(category) => Some(*category),
            Self::Unknown(_) => None,
        }
    }
}

/// Explicit table mapping raw road-layer labels to [`RoadCategory`].
///
/// Labels are compared after trimming, collapsing inner whitespace and
/// upper-casing, so `" autopista "` and `"AUTOPISTA"` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, RoadCategory>",
    into = "BTreeMap<String, RoadCategory>"
)]
pub struct CategoryMapping {
    labels: BTreeMap<String, RoadCategory>,
}

impl CategoryMapping {
    /// Creates an empty mapping. Every label classifies as unknown.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) the category for `label`.
    pub fn insert(&mut self, label: &str, category: RoadCategory) {
        self.labels.insert(normalize_label(label), category);
    }

    /// Builder-style variant of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, label: &str, category: RoadCategory) -> Self {
        self.insert(label, category);
        self
    }

    /// Classifies a raw label.
    #[must_use]
    pub fn classify(&self, label: &str) -> CategoryTag {
        self.labels.get(&normalize_label(label)).map_or_else(
            || CategoryTag::Unknown(label.trim().to_string()),
            |category| CategoryTag::Known(*category),
        )
    }

    /// Returns the number of labels in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the table has no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates over `(normalized label, category)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, RoadCategory)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for CategoryMapping {
    fn default() -> Self {
        RoadCategory::all()
            .iter()
            .fold(Self::empty(), |mapping, &category| {
                mapping.with(category.source_label(), category)
            })
    }
}

impl From<BTreeMap<String, RoadCategory>> for CategoryMapping {
    fn from(raw: BTreeMap<String, RoadCategory>) -> Self {
        raw.into_iter()
            .fold(Self::empty(), |mapping, (label, category)| {
                mapping.with(&label, category)
            })
    }
}

impl From<CategoryMapping> for BTreeMap<String, RoadCategory> {
    fn from(mapping: CategoryMapping) -> Self {
        mapping.labels
    }
}

/// Canonical form used as mapping key.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr;

    use super::*;

    #[test]
    fn default_mapping_covers_every_category_once() {
        let mapping = CategoryMapping::default();
        assert_eq!(mapping.len(), RoadCategory::all().len());

        let mapped: BTreeSet<RoadCategory> = mapping.iter().map(|(_, c)| c).collect();
        for category in RoadCategory::all() {
            assert!(
                mapped.contains(category),
                "{category:?} has no default source label"
            );
        }
    }

    #[test]
    fn classifies_source_labels() {
        let mapping = CategoryMapping::default();
        assert_eq!(
            mapping.classify("AUTOPISTA"),
            CategoryTag::Known(RoadCategory::Highway)
        );
        assert_eq!(
            mapping.classify("CARRETERA PAVIMENTO DOS VIAS O MAS"),
            CategoryTag::Known(RoadCategory::PavedMultiWay)
        );
    }

    #[test]
    fn classification_ignores_case_and_spacing() {
        let mapping = CategoryMapping::default();
        assert_eq!(
            mapping.classify("  camino   de tierra "),
            CategoryTag::Known(RoadCategory::DirtRoad)
        );
    }

    #[test]
    fn unknown_label_is_kept_verbatim() {
        let mapping = CategoryMapping::default();
        assert_eq!(
            mapping.classify(" SENDERO "),
            CategoryTag::Unknown("SENDERO".to_string())
        );
        assert_eq!(mapping.classify("SENDERO").known(), None);
    }

    #[test]
    fn column_names_are_unique() {
        let mut seen = BTreeSet::new();
        for category in RoadCategory::all() {
            assert!(
                seen.insert(category.column_name()),
                "Duplicate column name: {}",
                category.column_name()
            );
        }
    }

    #[test]
    fn strum_roundtrip_uses_screaming_snake_case() {
        assert_eq!(RoadCategory::PavedOneWay.to_string(), "PAVED_ONE_WAY");
        assert_eq!(
            RoadCategory::from_str("DIRT_ROAD").unwrap(),
            RoadCategory::DirtRoad
        );
        assert!(RoadCategory::from_str("dirt").is_err());
    }

    #[test]
    fn mapping_from_raw_table_normalizes_keys() {
        let mut raw = BTreeMap::new();
        raw.insert("a".to_string(), RoadCategory::PavedOneWay);
        let mapping = CategoryMapping::from(raw);
        assert_eq!(
            mapping.classify("A"),
            CategoryTag::Known(RoadCategory::PavedOneWay)
        );
    }
}
