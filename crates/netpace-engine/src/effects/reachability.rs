use std::fmt;
use std::sync::Arc;

use netpace_probe::Probe;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{target_url as validate_target, FinishedLatch};
use crate::data::{ReachabilityOptions, ReachabilityResult};
use crate::error::{Error, Result};

/// Receives the verdict of a reachability check.
pub type FinishedHook = Arc<dyn Fn(&ReachabilityResult) + Send + Sync>;

/// Answers "is this URL reachable within the deadline", exactly once.
///
/// The request and the optional deadline timer run as separate tasks and race
/// to settle a [`FinishedLatch`]; the loser's result is discarded. A request
/// that loses to the deadline is aborted.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use netpace_engine::{ReachabilityEngine, ReachabilityOptions};
/// use netpace_probe::PhasedHttpClient;
///
/// # async fn run() -> netpace_engine::Result<()> {
/// let engine = ReachabilityEngine::new(
///     "https://example.com/",
///     ReachabilityOptions::default().timeout(Duration::from_secs(5)),
///     Arc::new(PhasedHttpClient::new()?),
/// )?
/// .on_finished(|verdict| println!("{} reachable: {}", verdict.target_url, verdict.is_reachable()));
///
/// let verdict = engine.check().await;
/// # let _ = verdict;
/// # Ok(())
/// # }
/// ```
pub struct ReachabilityEngine<P> {
    target_url: String,
    options: ReachabilityOptions,
    probe: Arc<P>,
    on_finished: FinishedHook,
}

impl<P> ReachabilityEngine<P>
where
    P: Probe + 'static,
{
    /// Fails with [`Error::Configuration`] for an empty or non-absolute URL.
    pub fn new(
        target_url: impl Into<String>,
        options: ReachabilityOptions,
        probe: Arc<P>,
    ) -> Result<Self> {
        let target_url = target_url.into();
        validate_target(&target_url)?;
        Ok(Self {
            target_url,
            options,
            probe,
            on_finished: Arc::new(|_: &ReachabilityResult| {}),
        })
    }

    /// Set the verdict hook. Delivery can happen right after
    /// [`start`](Self::start), so set it before.
    #[must_use]
    pub fn on_finished(mut self, hook: impl Fn(&ReachabilityResult) + Send + Sync + 'static) -> Self {
        self.on_finished = Arc::new(hook);
        self
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Issue the request and arm the deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> PendingVerdict {
        let (tx, rx) = oneshot::channel();
        let hook = self.on_finished;
        let latch = Arc::new(FinishedLatch::new(move |verdict: ReachabilityResult| {
            hook(&verdict);
            let _ = tx.send(verdict);
        }));
        let settled = CancellationToken::new();
        let timeout = self.options.effective_timeout();
        debug!("checking reachability of {} (deadline {:?})", self.target_url, timeout);

        let request = {
            let latch = Arc::clone(&latch);
            let settled = settled.clone();
            let probe = self.probe;
            let url = self.target_url.clone();
            let options = self.options.request_options();
            tokio::spawn(async move {
                let verdict = match probe.request(&url, options).await {
                    Ok(response) => ReachabilityResult::reachable(url.as_str(), response),
                    Err(e) => ReachabilityResult::unreachable(url.as_str(), e.into()),
                };
                if !latch.settle(verdict) {
                    debug!("late result for {} discarded", url);
                }
                settled.cancel();
            })
        };

        if let Some(timeout) = timeout {
            let abort = request.abort_handle();
            let url = self.target_url.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = settled.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        if latch.settle(ReachabilityResult::unreachable(url.as_str(), Error::Timeout(timeout))) {
                            debug!("{} timed out after {:?}", url, timeout);
                            abort.abort();
                        }
                    }
                }
            });
        }

        PendingVerdict {
            target_url: self.target_url,
            rx,
        }
    }

    /// Start the check and wait for its verdict. The hook still fires.
    pub async fn check(self) -> ReachabilityResult {
        self.start().verdict().await
    }
}

impl<P> fmt::Debug for ReachabilityEngine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReachabilityEngine")
            .field("target_url", &self.target_url)
            .field("options", &self.options)
            .finish()
    }
}

/// Verdict of a started check.
#[derive(Debug)]
pub struct PendingVerdict {
    target_url: String,
    rx: oneshot::Receiver<ReachabilityResult>,
}

impl PendingVerdict {
    /// Wait for the verdict. Ends with [`Error::Interrupted`] only if the
    /// request task panicked before settling.
    pub async fn verdict(self) -> ReachabilityResult {
        match self.rx.await {
            Ok(verdict) => verdict,
            Err(_) => ReachabilityResult::unreachable(
                self.target_url,
                Error::Interrupted("request task ended before settling".to_string()),
            ),
        }
    }
}
