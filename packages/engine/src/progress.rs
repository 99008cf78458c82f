//! Progress hooks for the clip pass.
//!
//! The pass counts work in routes: [`ProgressCallback::set_total`] is
//! called once with the number of prepared routes, then
//! [`ProgressCallback::inc`] once per route as its candidate boundaries are
//! done. Rendering lives in front-end crates.

use std::sync::Arc;

/// Receiver of clip pass progress.
///
/// `inc` is called from rayon workers when the pass runs in parallel, so
/// implementations must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of routes the pass will visit.
    fn set_total(&self, total: u64);

    /// `delta` more routes are finished.
    fn inc(&self, delta: u64);

    /// Replaces the status line.
    fn set_message(&self, msg: String);

    /// Called once after the last route with a closing status line.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Used when a caller passes no progress receiver.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use road_density_engine_models::EngineConfig;
    use road_density_layer_models::{BoundaryId, BoundaryRecord, RawCoordinates, RouteRecord};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        total: AtomicU64,
        done: AtomicU64,
        finished: Mutex<Option<String>>,
    }

    impl ProgressCallback for Recorder {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }

        fn set_message(&self, _msg: String) {}

        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }

    #[test]
    fn clip_pass_reports_one_step_per_route() {
        let boundaries = vec![BoundaryRecord {
            id: BoundaryId::from("square"),
            area: Some(1.0),
            coordinates: RawCoordinates::polygon(&[&[
                [0.0, 0.0],
                [1.0, 0.0],
                [1.0, 1.0],
                [0.0, 1.0],
            ]]),
        }];
        let routes: Vec<RouteRecord> = (0..4u8)
            .map(|i| RouteRecord {
                category: "AUTOPISTA".to_string(),
                coordinates: RawCoordinates::line(&[
                    [f64::from(i) * 0.2, -1.0],
                    [f64::from(i) * 0.2, 2.0],
                ]),
            })
            .collect();

        let recorder = Arc::new(Recorder::default());
        let progress: Arc<dyn ProgressCallback> = recorder.clone();
        let layers =
            crate::clip_layers(&boundaries, &routes, &EngineConfig::default(), Some(progress));

        assert_eq!(layers.prepared.routes.len(), 4);
        assert_eq!(recorder.total.load(Ordering::SeqCst), 4);
        assert_eq!(recorder.done.load(Ordering::SeqCst), 4);
        assert!(recorder.finished.lock().unwrap().is_some());
    }
}
