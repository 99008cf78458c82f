//! TOML configuration for the command line tool.
//!
//! ```toml
//! [engine]
//! length_mode = "GEODESIC"
//! ring_policy = "ALL_PARTS"
//!
//! [engine.categories]
//! "AUTOPISTA" = "HIGHWAY"
//!
//! [fields]
//! boundary_id = "NOM_CANT"
//! ```
//!
//! Every key is optional. An `[engine.categories]` table replaces the
//! default label mapping rather than extending it.

use std::path::Path;

use road_density_engine_models::{EngineConfig, LengthMode, RingPolicy};
use road_density_layer_models::LayerFieldMapping;
use serde::{Deserialize, Serialize};

/// Contents of a `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub fields: LayerFieldMapping,
}

/// Command line switches that take precedence over the config file.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct EngineFlags {
    /// Measure lengths on the WGS84 ellipsoid instead of the planar x100 scale
    #[arg(long)]
    pub geodesic: bool,
    /// Keep every part and hole of each boundary instead of only the first outer ring
    #[arg(long)]
    pub all_parts: bool,
    /// Test every (boundary, route) pair instead of pruning with an R-tree
    #[arg(long)]
    pub no_index: bool,
    /// Run the clip pass on a single thread
    #[arg(long)]
    pub sequential: bool,
}

impl AppConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    /// for this schema.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies command line overrides.
    #[must_use]
    pub fn with_flags(mut self, flags: EngineFlags) -> Self {
        if flags.geodesic {
            self.engine.length_mode = LengthMode::Geodesic;
        }
        if flags.all_parts {
            self.engine.ring_policy = RingPolicy::AllParts;
        }
        if flags.no_index {
            self.engine.use_spatial_index = false;
        }
        if flags.sequential {
            self.engine.parallel = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use road_density_road_models::{CategoryTag, RoadCategory};

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fields.boundary_id, "canton");
    }

    #[test]
    fn nested_tables_are_read() {
        let config: AppConfig = toml::from_str(
            r#"
            [engine]
            ring_policy = "ALL_PARTS"
            parallel = false

            [engine.categories]
            "ruta nacional" = "HIGHWAY"

            [fields]
            boundary_id = "NOM_CANT"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.ring_policy, RingPolicy::AllParts);
        assert!(!config.engine.parallel);
        assert_eq!(
            config.engine.categories.classify("RUTA NACIONAL"),
            CategoryTag::Known(RoadCategory::Highway)
        );
        assert_eq!(config.engine.categories.classify("AUTOPISTA").known(), None);
        assert_eq!(config.fields.boundary_id, "NOM_CANT");
        assert_eq!(config.fields.route_category, "categoria");
    }

    #[test]
    fn unknown_length_mode_is_rejected() {
        assert!(toml::from_str::<AppConfig>("[engine]\nlength_mode = \"SPHERICAL\"").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let config = AppConfig::default().with_flags(EngineFlags {
            geodesic: true,
            all_parts: false,
            no_index: true,
            sequential: true,
        });
        assert_eq!(config.engine.length_mode, LengthMode::Geodesic);
        assert_eq!(config.engine.ring_policy, RingPolicy::FirstOuterRing);
        assert!(!config.engine.use_spatial_index);
        assert!(!config.engine.parallel);
    }

    #[test]
    fn missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("road_density_cli_missing_config.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
