//! Generation manifest stored next to the outputs of `run`.
//!
//! The manifest records the fingerprint of the inputs that produced the
//! files in an output directory. A later run with unchanged inputs and
//! configuration leaves those files alone.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Current manifest schema version. Bump this when the manifest format
/// changes so that existing output directories are regenerated.
pub const MANIFEST_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    /// Fingerprint of both layers and the engine configuration.
    pub fingerprint: String,
    /// Output name to the RFC 3339 time it was last written.
    pub outputs: BTreeMap<String, String>,
}

impl Manifest {
    #[must_use]
    pub const fn new(fingerprint: String) -> Self {
        Self {
            version: MANIFEST_VERSION,
            fingerprint,
            outputs: BTreeMap::new(),
        }
    }
}

/// Loads the manifest from `dir/manifest.json`.
///
/// Returns `None` if the file does not exist or cannot be parsed.
pub fn load_manifest(dir: &Path) -> Option<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        log::info!("No existing manifest found in {}", dir.display());
        return None;
    };
    match serde_json::from_str(&contents) {
        Ok(m) => {
            log::info!("Loaded manifest from {}", path.display());
            Some(m)
        }
        Err(e) => {
            log::warn!("Failed to parse manifest {}: {e}", path.display());
            None
        }
    }
}

/// Writes the manifest to `dir/manifest.json`.
///
/// Writes to a `.tmp` file first and renames it into place.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_manifest(dir: &Path, manifest: &Manifest) -> Result<(), Box<dyn std::error::Error>> {
    let path = dir.join(MANIFEST_FILE);
    let tmp_path = dir.join(format!("{MANIFEST_FILE}.tmp"));
    let contents = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, &path)?;
    log::info!("Saved manifest to {}", path.display());
    Ok(())
}

/// Records a successfully written output.
pub fn record_output(manifest: &mut Manifest, output_name: &str) {
    manifest
        .outputs
        .insert(output_name.to_string(), chrono::Utc::now().to_rfc3339());
}

/// Determines whether an output has to be written again.
///
/// Returns `true` if any of: `force` is set, no manifest exists, manifest
/// version mismatch, fingerprint changed, output not recorded in the
/// manifest, or output file missing from disk.
pub fn output_needs_regen(
    manifest: Option<&Manifest>,
    fingerprint: &str,
    output_name: &str,
    output_path: &Path,
    force: bool,
) -> bool {
    if force {
        return true;
    }

    let Some(m) = manifest else {
        return true;
    };

    if m.version != MANIFEST_VERSION || m.fingerprint != fingerprint {
        return true;
    }

    !m.outputs.contains_key(output_name) || !output_path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "road_density_manifest_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_then_load() {
        let dir = temp_dir("roundtrip");
        let mut manifest = Manifest::new("abc".to_string());
        record_output(&mut manifest, "aggregates.csv");
        save_manifest(&dir, &manifest).unwrap();

        let loaded = load_manifest(&dir).unwrap();
        assert_eq!(loaded, manifest);
        assert!(!dir.join("manifest.json.tmp").exists());
        assert!(
            chrono::DateTime::parse_from_rfc3339(&loaded.outputs["aggregates.csv"]).is_ok()
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_manifest_is_ignored() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("manifest.json"), "{ not json").unwrap();
        assert!(load_manifest(&dir).is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn regen_rules() {
        let dir = temp_dir("regen");
        let output = dir.join("aggregates.csv");
        std::fs::write(&output, "boundary\n").unwrap();

        let mut manifest = Manifest::new("abc".to_string());
        record_output(&mut manifest, "aggregates.csv");

        assert!(!output_needs_regen(Some(&manifest), "abc", "aggregates.csv", &output, false));
        assert!(output_needs_regen(Some(&manifest), "abc", "aggregates.csv", &output, true));
        assert!(output_needs_regen(None, "abc", "aggregates.csv", &output, false));
        assert!(output_needs_regen(Some(&manifest), "def", "aggregates.csv", &output, false));
        assert!(output_needs_regen(Some(&manifest), "abc", "summary.json", &output, false));

        let stale = Manifest {
            version: MANIFEST_VERSION + 1,
            ..manifest.clone()
        };
        assert!(output_needs_regen(Some(&stale), "abc", "aggregates.csv", &output, false));

        std::fs::remove_file(&output).unwrap();
        assert!(output_needs_regen(Some(&manifest), "abc", "aggregates.csv", &output, false));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
