use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Operation<E> = Arc<dyn Fn() -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// Observer of the error that halted a loop.
pub type LoopFailureHook<E> = Arc<dyn Fn(&E) + Send + Sync>;

enum LoopState {
    Idle,
    Running {
        generation: u64,
        token: CancellationToken,
    },
}

struct Inner {
    state: LoopState,
    generation: u64,
}

/// Runs an asynchronous operation back to back until stopped.
///
/// At most one operation is in flight at any time, including across a
/// `stop()`/`play()` pair: a new driver waits for the previous iteration to
/// settle before issuing its own. Stopping cancels the token of the current
/// run; the in-flight operation is left to finish (unless
/// [`abort_on_stop`](Self::abort_on_stop) is set) and its completion never
/// schedules another iteration.
///
/// A failing operation halts the loop. The error goes to the
/// [`on_failure`](Self::on_failure) hook if one is set and is logged at `warn`.
///
/// # Examples
///
/// ```no_run
/// use netpace_engine::CancelableLoop;
///
/// # async fn run() {
/// let ticker = CancelableLoop::new(|| async {
///     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
///     Ok::<(), std::io::Error>(())
/// });
/// ticker.play();
/// ticker.stop();
/// # }
/// ```
pub struct CancelableLoop<E> {
    operation: Operation<E>,
    inner: Arc<Mutex<Inner>>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
    abort_on_stop: bool,
    on_failure: Option<LoopFailureHook<E>>,
    label: String,
}

impl<E> CancelableLoop<E>
where
    E: fmt::Display + Send + 'static,
{
    pub fn new<F, Fut>(operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        Self {
            operation: Arc::new(move || operation().boxed()),
            inner: Arc::new(Mutex::new(Inner {
                state: LoopState::Idle,
                generation: 0,
            })),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
            abort_on_stop: false,
            on_failure: None,
            label: "loop".to_string(),
        }
    }

    /// Drop the in-flight operation when stopped instead of letting it finish.
    #[must_use]
    pub fn abort_on_stop(mut self, abort: bool) -> Self {
        self.abort_on_stop = abort;
        self
    }

    #[must_use]
    pub fn on_failure(mut self, hook: LoopFailureHook<E>) -> Self {
        self.on_failure = Some(hook);
        self
    }

    /// Name used in log lines.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Start iterating. No-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn play(&self) {
        let (generation, token) = {
            let mut inner = self.inner.lock();
            if matches!(inner.state, LoopState::Running { .. }) {
                return;
            }
            inner.generation += 1;
            let token = CancellationToken::new();
            inner.state = LoopState::Running {
                generation: inner.generation,
                token: token.clone(),
            };
            (inner.generation, token)
        };

        debug!("{} started (run {})", self.label, generation);
        let driver = Driver {
            operation: Arc::clone(&self.operation),
            inner: Arc::clone(&self.inner),
            in_flight: Arc::clone(&self.in_flight),
            abort_on_stop: self.abort_on_stop,
            on_failure: self.on_failure.clone(),
            label: self.label.clone(),
        };
        tokio::spawn(driver.run(generation, token));
    }

    /// Stop iterating. No-op while idle.
    pub fn pause(&self) {
        let previous = std::mem::replace(&mut self.inner.lock().state, LoopState::Idle);
        if let LoopState::Running { generation, token } = previous {
            token.cancel();
            debug!("{} stopped (run {})", self.label, generation);
        }
    }

    /// Same as [`pause`](Self::pause).
    pub fn stop(&self) {
        self.pause();
    }

    pub fn is_running(&self) -> bool {
        matches!(self.inner.lock().state, LoopState::Running { .. })
    }
}

impl<E> fmt::Debug for CancelableLoop<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CancelableLoop")
            .field("label", &self.label)
            .field("running", &matches!(inner.state, LoopState::Running { .. }))
            .field("generation", &inner.generation)
            .field("abort_on_stop", &self.abort_on_stop)
            .finish()
    }
}

impl<E> Drop for CancelableLoop<E> {
    fn drop(&mut self) {
        if let LoopState::Running { token, .. } = &self.inner.lock().state {
            token.cancel();
        }
    }
}

/// One run of a loop, from `play()` to cancellation or failure.
struct Driver<E> {
    operation: Operation<E>,
    inner: Arc<Mutex<Inner>>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
    abort_on_stop: bool,
    on_failure: Option<LoopFailureHook<E>>,
    label: String,
}

impl<E> Driver<E>
where
    E: fmt::Display + Send + 'static,
{
    async fn run(self, generation: u64, token: CancellationToken) {
        loop {
            let result = {
                let _slot = self.in_flight.lock().await;
                if token.is_cancelled() {
                    return;
                }

                let operation = (self.operation)();
                if self.abort_on_stop {
                    tokio::select! {
                        result = operation => result,
                        _ = token.cancelled() => {
                            debug!("{} aborted in-flight operation (run {})", self.label, generation);
                            return;
                        }
                    }
                } else {
                    operation.await
                }
            };

            // Stop was called while the operation ran.
            if token.is_cancelled() {
                return;
            }

            if let Err(e) = result {
                self.halt(generation, &e);
                return;
            }

            tokio::task::yield_now().await;
        }
    }

    fn halt(&self, generation: u64, error: &E) {
        {
            let mut inner = self.inner.lock();
            if matches!(inner.state, LoopState::Running { generation: current, .. } if current == generation)
            {
                inner.state = LoopState::Idle;
            }
        }

        warn!("{} halted (run {}): {}", self.label, generation, error);
        if let Some(ref hook) = self.on_failure {
            hook(error);
        }
    }
}
