//! Observer trait for per-conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionObserver>`] via
//! [`crate::config::ConversionConfigBuilder::observer`] to watch each
//! conversion walk through `Start → BackendReady → DocumentOpened →
//! Rasterized → Encoded → Done`, or stop early with a failure.
//!
//! # Example
//!
//! ```rust
//! use pdf2png::{ConversionConfig, ConversionObserver, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountDone(AtomicUsize);
//!
//! impl ConversionObserver for CountDone {
//!     fn on_stage(&self, _name: &str, stage: Stage) {
//!         if stage == Stage::Done {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .observer(Arc::new(CountDone(AtomicUsize::new(0))) as Arc<dyn ConversionObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{FailureKind, Stage};
use std::sync::Arc;

/// Called by the conversion pipeline as each conversion advances.
///
/// Stages before `BackendReady` run on the caller's task; `DocumentOpened`
/// and `Rasterized` are reported from a blocking worker thread. Concurrent
/// conversions call the same observer from different threads, so
/// implementations must synchronise any shared state.
pub trait ConversionObserver: Send + Sync {
    /// Called when conversion `name` reaches `stage`.
    fn on_stage(&self, name: &str, stage: Stage) {
        let _ = (name, stage);
    }

    /// Called once when conversion `name` fails; no further stages follow.
    fn on_failed(&self, name: &str, kind: FailureKind, error: &str) {
        let _ = (name, kind, error);
    }
}

/// An observer that ignores every event.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type SharedObserver = Arc<dyn ConversionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionObserver for Recorder {
        fn on_stage(&self, name: &str, stage: Stage) {
            self.events.lock().unwrap().push(format!("{name}:{stage:?}"));
        }

        fn on_failed(&self, name: &str, kind: FailureKind, _error: &str) {
            self.events.lock().unwrap().push(format!("{name}:failed:{kind:?}"));
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_stage("a.pdf", Stage::Start);
        o.on_failed("a.pdf", FailureKind::Encoding, "no data");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let r = Recorder::default();
        r.on_stage("a.pdf", Stage::Start);
        r.on_stage("a.pdf", Stage::BackendReady);
        r.on_failed("a.pdf", FailureKind::DocumentParse, "bad header");
        let events = r.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["a.pdf:Start", "a.pdf:BackendReady", "a.pdf:failed:DocumentParse"]
        );
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: SharedObserver = Arc::new(NoopObserver);
        o.on_stage("b.pdf", Stage::Done);
    }
}
