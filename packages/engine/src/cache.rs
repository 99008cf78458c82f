//! Explicit memoization of engine runs.
//!
//! Results are keyed by a [`LayerFingerprint`]: a SHA-256 digest of both
//! input layers and the engine configuration. Nothing is evicted unless
//! the caller asks for it.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use road_density_engine_models::EngineConfig;
use road_density_layer_models::{BoundaryRecord, RouteRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::progress::ProgressCallback;
use crate::{EngineError, EngineOutput};

/// Bump whenever the engine's output for identical inputs changes.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Content hash identifying one combination of inputs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerFingerprint(String);

#[derive(Serialize)]
struct FingerprintInput<'a> {
    version: u32,
    boundaries: &'a [BoundaryRecord],
    routes: &'a [RouteRecord],
    config: &'a EngineConfig,
}

/// Feeds serializer output straight into the hasher.
struct HashWriter<'a>(&'a mut Sha256);

impl io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LayerFingerprint {
    /// Hashes both layers and the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fingerprint`] if the inputs cannot be encoded.
    pub fn compute(
        boundaries: &[BoundaryRecord],
        routes: &[RouteRecord],
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(
            HashWriter(&mut hasher),
            &FingerprintInput {
                version: CACHE_SCHEMA_VERSION,
                boundaries,
                routes,
                config,
            },
        )?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Derives a fingerprint that also covers `extra`, for callers whose
    /// outputs depend on more than the engine inputs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fingerprint`] if `extra` cannot be encoded.
    pub fn combine<T: Serialize>(&self, extra: &T) -> Result<Self, EngineError> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(HashWriter(&mut hasher), &(&self.0, extra))?;
        Ok(Self(hex::encode(hasher.finalize())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Entries = BTreeMap<LayerFingerprint, Arc<EngineOutput>>;

/// Thread-safe map from fingerprint to a finished run.
#[derive(Debug, Default)]
pub struct AggregateCache {
    entries: Mutex<Entries>,
}

impl AggregateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached output for `fingerprint`, computing and storing
    /// it first if absent.
    ///
    /// The lock is not held while `compute` runs. If two callers race on
    /// the same fingerprint the first stored result wins.
    pub fn get_or_compute(
        &self,
        fingerprint: &LayerFingerprint,
        compute: impl FnOnce() -> EngineOutput,
    ) -> Arc<EngineOutput> {
        if let Some(hit) = self.get(fingerprint) {
            log::debug!("Aggregate cache hit for {fingerprint}");
            return hit;
        }

        log::debug!("Aggregate cache miss for {fingerprint}");
        let output = Arc::new(compute());
        Arc::clone(
            self.lock()
                .entry(fingerprint.clone())
                .or_insert(output),
        )
    }

    /// Fingerprints both layers and runs the engine unless an identical
    /// run is cached.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fingerprint`] if the inputs cannot be hashed.
    pub fn run(
        &self,
        boundaries: &[BoundaryRecord],
        routes: &[RouteRecord],
        config: &EngineConfig,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<Arc<EngineOutput>, EngineError> {
        let fingerprint = LayerFingerprint::compute(boundaries, routes, config)?;
        Ok(self.get_or_compute(&fingerprint, || {
            crate::run(boundaries, routes, config, progress)
        }))
    }

    #[must_use]
    pub fn get(&self, fingerprint: &LayerFingerprint) -> Option<Arc<EngineOutput>> {
        self.lock().get(fingerprint).cloned()
    }

    /// Drops one entry. Returns `true` if it was present.
    pub fn invalidate(&self, fingerprint: &LayerFingerprint) -> bool {
        self.lock().remove(fingerprint).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
