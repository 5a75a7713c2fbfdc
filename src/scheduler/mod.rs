//! Refresh scheduler that periodically re-fetches ticks and re-aggregates.

use crate::aggregate::AggregationConfig;
use crate::models::EndpointState;
use crate::store::IngestError;
use crate::view::Dashboard;

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Semaphore};

/// Default refresh interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the failure reporting channel.
const FAILURE_CHANNEL_CAPACITY: usize = 16;

/// A fetch that failed during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshFailure {
    pub at: DateTime<Utc>,
    pub error: IngestError,
}

/// The latest published result of the refresh loop.
///
/// A failed fetch only updates `last_failure`; the previous dashboard stays
/// in place until the next successful refresh.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub dashboard: Option<Arc<Dashboard>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<RefreshFailure>,
}

/// Builds independent refresh loops. Holds no global state.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: Duration,
    config: AggregationConfig,
}

impl RefreshScheduler {
    /// A zero `interval` falls back to [`DEFAULT_REFRESH_INTERVAL`].
    pub fn new(interval: Duration, config: AggregationConfig) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "Zero refresh interval, using {}s",
                DEFAULT_REFRESH_INTERVAL.as_secs()
            );
            DEFAULT_REFRESH_INTERVAL
        } else {
            interval
        };

        Self { interval, config }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start a refresh loop on the current tokio runtime.
    ///
    /// `fetch` is invoked immediately and then once per interval until the
    /// returned handle is cancelled or dropped. A tick that fires while the
    /// previous fetch is still running is skipped.
    pub fn start<F, Fut>(&self, fetch: F) -> RefreshHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<EndpointState>, IngestError>> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(RefreshState::default());
        let (failures_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = broadcast::channel(1);

        let shared = Arc::new(Shared {
            cancelled: AtomicBool::new(false),
            state_tx,
            failures_tx: failures_tx.clone(),
            config: self.config,
        });

        tokio::spawn(run_refresh_loop(fetch, self.interval, shared.clone(), stop_rx));

        RefreshHandle {
            shared,
            stop_tx,
            state_rx,
            failures_tx,
        }
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL, AggregationConfig::default())
    }
}

/// Handle to a running refresh loop. Dropping it cancels the loop.
pub struct RefreshHandle {
    shared: Arc<Shared>,
    stop_tx: broadcast::Sender<()>,
    state_rx: watch::Receiver<RefreshState>,
    failures_tx: broadcast::Sender<RefreshFailure>,
}

impl RefreshHandle {
    /// Stop future refreshes. Safe to call more than once.
    ///
    /// A fetch already in flight runs to completion but its result is
    /// discarded.
    pub fn cancel(&self) {
        // The flag flips under the state lock, so once this returns no
        // refresh result can be published.
        let mut first = false;
        self.shared.state_tx.send_if_modified(|_| {
            first = !self.shared.cancelled.swap(true, Ordering::SeqCst);
            false
        });

        if first {
            let _ = self.stop_tx.send(());
            tracing::info!("Refresh scheduler cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Snapshot of the latest published state.
    pub fn state(&self) -> RefreshState {
        self.state_rx.borrow().clone()
    }

    /// The most recent successfully built dashboard, if any.
    pub fn latest(&self) -> Option<Arc<Dashboard>> {
        self.state_rx.borrow().dashboard.clone()
    }

    /// Watch the published state.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state_rx.clone()
    }

    /// Receive failures reported after this call.
    pub fn failures(&self) -> broadcast::Receiver<RefreshFailure> {
        self.failures_tx.subscribe()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Shared {
    cancelled: AtomicBool,
    state_tx: watch::Sender<RefreshState>,
    failures_tx: broadcast::Sender<RefreshFailure>,
    config: AggregationConfig,
}

impl Shared {
    /// Apply `update` unless the loop has been cancelled. The cancellation
    /// check runs under the same lock as the update.
    fn publish(&self, update: impl FnOnce(&mut RefreshState)) -> bool {
        self.state_tx.send_if_modified(|state| {
            if self.cancelled.load(Ordering::SeqCst) {
                return false;
            }
            update(state);
            true
        })
    }

    fn complete(&self, result: Result<Vec<EndpointState>, IngestError>) {
        if self.cancelled.load(Ordering::SeqCst) {
            tracing::debug!("Discarding refresh result after cancellation");
            return;
        }

        let now = Utc::now();
        match result {
            Ok(states) => {
                let dashboard = Arc::new(Dashboard::build(&states, &self.config, now));
                let count = dashboard.endpoints.len();
                if self.publish(|state| {
                    state.dashboard = Some(dashboard);
                    state.last_success = Some(now);
                }) {
                    tracing::info!("Refreshed {} endpoints", count);
                } else {
                    tracing::debug!("Discarding refresh result after cancellation");
                }
            }
            Err(error) => {
                let message = error.to_string();
                let failure = RefreshFailure { at: now, error };
                if self.publish(|state| {
                    state.last_failure = Some(failure.clone());
                    // No subscribers is fine.
                    let _ = self.failures_tx.send(failure);
                }) {
                    tracing::error!("Refresh failed: {}", message);
                } else {
                    tracing::debug!("Discarding refresh failure after cancellation");
                }
            }
        }
    }
}

async fn run_refresh_loop<F, Fut>(
    fetch: F,
    interval: Duration,
    shared: Arc<Shared>,
    mut stop_rx: broadcast::Receiver<()>,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<EndpointState>, IngestError>> + Send + 'static,
{
    let in_flight = Arc::new(Semaphore::new(1));

    // The first tick completes immediately.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                break;
            }
            _ = ticker.tick() => {
                if shared.cancelled.load(Ordering::SeqCst) {
                    break;
                }

                let permit = match in_flight.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::warn!("Skipping refresh while the previous fetch is still running");
                        continue;
                    }
                };

                let pending = fetch();
                let shared = shared.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    let result = pending.await;
                    shared.complete(result);
                });
            }
        }
    }

    tracing::debug!("Refresh loop stopped");
}
