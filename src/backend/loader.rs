//! Lazy, deduplicated initialisation of a rendering backend.
//!
//! Loading pdfium means binding a shared library, which is slow and must not
//! happen twice. The loader keeps an explicit three-phase state:
//!
//! ```text
//! Unstarted ──ensure_ready──▶ Loading(shared future) ──ok──▶ Ready(Arc<B>)
//!     ▲                               │
//!     └────────────── err ────────────┘
//! ```
//!
//! The `Unstarted → Loading` transition happens under the state mutex, so
//! however many callers arrive before the first load finishes, exactly one
//! init future is created; everyone else awaits a clone of the same
//! [`Shared`] future. A failed load puts the state back to `Unstarted`, so the
//! next call starts a fresh attempt instead of replaying the old error.

use crate::error::LoadError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type InitFn<B> = dyn Fn() -> BoxFuture<'static, Result<B, LoadError>> + Send + Sync;
type InFlight<B> = Shared<BoxFuture<'static, Result<Arc<B>, LoadError>>>;

enum LoaderState<B> {
    Unstarted,
    Loading { attempt: u64, load: InFlight<B> },
    Ready(Arc<B>),
}

/// Observable phase of a [`BackendLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    Unstarted,
    Loading,
    Ready,
}

/// Owns the one-time initialisation of a backend `B`.
pub struct BackendLoader<B> {
    state: Mutex<LoaderState<B>>,
    init: Box<InitFn<B>>,
    attempts: AtomicU64,
}

impl<B> BackendLoader<B>
where
    B: Send + Sync + 'static,
{
    /// Create a loader that runs `init` on first use (and again after a
    /// failed attempt).
    pub fn new<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, LoadError>> + Send + 'static,
    {
        Self {
            state: Mutex::new(LoaderState::Unstarted),
            init: Box::new(move || init().boxed()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Create a loader that is already `Ready` with `backend`.
    pub fn preloaded(backend: B) -> Self {
        Self {
            state: Mutex::new(LoaderState::Ready(Arc::new(backend))),
            init: Box::new(|| {
                async { Err(LoadError::new("preloaded backend cannot be reloaded")) }.boxed()
            }),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the backend, loading it first if needed.
    ///
    /// Safe to call concurrently: callers that arrive while a load is in
    /// flight wait for that load rather than starting their own.
    pub async fn ensure_ready(&self) -> Result<Arc<B>, LoadError> {
        let (attempt, load) = {
            let mut state = self.lock();
            match &*state {
                LoaderState::Ready(backend) => return Ok(Arc::clone(backend)),
                LoaderState::Loading { attempt, load } => {
                    debug!(attempt, "Joining in-flight backend load");
                    (*attempt, load.clone())
                }
                LoaderState::Unstarted => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(attempt, "Loading rendering backend");
                    let load = (self.init)()
                        .map(|result| result.map(Arc::new))
                        .boxed()
                        .shared();
                    *state = LoaderState::Loading {
                        attempt,
                        load: load.clone(),
                    };
                    (attempt, load)
                }
            }
        };

        let outcome = load.await;

        let mut state = self.lock();
        let still_ours =
            matches!(&*state, LoaderState::Loading { attempt: current, .. } if *current == attempt);
        if still_ours {
            *state = match &outcome {
                Ok(backend) => {
                    info!(attempt, "Rendering backend ready");
                    LoaderState::Ready(Arc::clone(backend))
                }
                Err(e) => {
                    warn!(attempt, "Backend load failed, next call will retry: {}", e);
                    LoaderState::Unstarted
                }
            };
        }
        outcome
    }

    /// Number of initialisation attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> LoaderPhase {
        match &*self.lock() {
            LoaderState::Unstarted => LoaderPhase::Unstarted,
            LoaderState::Loading { .. } => LoaderPhase::Loading,
            LoaderState::Ready(_) => LoaderPhase::Ready,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> fmt::Debug for BackendLoader<B>
where
    B: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendLoader")
            .field("phase", &self.phase())
            .field("attempts", &self.attempts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Engine(usize);

    fn counting_loader(calls: Arc<AtomicUsize>, fail_first: usize) -> BackendLoader<Engine> {
        BackendLoader::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
                if n <= fail_first {
                    Err(LoadError::new(format!("attempt {n} failed")))
                } else {
                    Ok(Engine(n))
                }
            }
        })
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&calls), 0);

        let results = futures::future::join_all((0..16).map(|_| loader.ensure_ready())).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.attempts(), 1);
        let first = results[0].as_ref().expect("load should succeed");
        for r in &results {
            assert!(Arc::ptr_eq(first, r.as_ref().unwrap()));
        }
        assert_eq!(loader.phase(), LoaderPhase::Ready);
    }

    #[tokio::test]
    async fn ready_loader_does_not_reload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&calls), 0);
        let a = loader.ensure_ready().await.unwrap();
        let b = loader.ensure_ready().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_resets_for_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&calls), 1);

        let err = loader.ensure_ready().await.err().expect("first load fails");
        assert!(err.reason().contains("attempt 1"));
        assert_eq!(loader.phase(), LoaderPhase::Unstarted);

        let engine = loader.ensure_ready().await.expect("retry succeeds");
        assert_eq!(engine.0, 2);
        assert_eq!(loader.attempts(), 2);
        assert_eq!(loader.phase(), LoaderPhase::Ready);
    }

    #[tokio::test]
    async fn waiters_on_failed_load_all_see_the_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&calls), 1);

        let results = futures::future::join_all((0..4).map(|_| loader.ensure_ready())).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn preloaded_is_ready_without_attempts() {
        let loader = BackendLoader::preloaded(Engine(7));
        assert_eq!(loader.phase(), LoaderPhase::Ready);
        let engine = tokio_test::block_on(loader.ensure_ready()).unwrap();
        assert_eq!(engine.0, 7);
        assert_eq!(loader.attempts(), 0);
    }

    #[test]
    fn debug_shows_phase() {
        let loader = counting_loader(Arc::new(AtomicUsize::new(0)), 0);
        assert!(format!("{loader:?}").contains("Unstarted"));
    }
}
