//! Wait for a condition over eventually-consistent remote state.
//!
//! The condition is re-evaluated on a fixed interval until it holds or the
//! timeout elapses. The timeout is measured from the start of the wait, so a
//! slow evaluation may overshoot it; the condition is always evaluated at
//! least once.

#![deny(clippy::unwrap_used, clippy::panic)]

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::PollerError;
pub use settings::PollerSettings;

mod error;
mod settings;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Waits until `predicate` returns true, or fails with `PollerError::Timeout`.
pub async fn wait_until<F, Fut>(predicate: F, timeout: Duration) -> Result<(), PollerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    Poller::new(timeout).wait_until(predicate).await
}

/// Waits until `value_fn` returns a value equal to `expected`, or fails with
/// `PollerError::Timeout`. With `verbose`, every change of the observed value is logged.
pub async fn wait_until_eq<F, Fut, T>(
    value_fn: F,
    expected: T,
    timeout: Duration,
    verbose: bool,
) -> Result<(), PollerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: PartialEq + Debug,
{
    Poller::new(timeout)
        .wait_until_eq(value_fn, expected, verbose)
        .await
}

/// Fixed-interval poller with an optional cancellation token.
///
/// Dropping a wait future stops it as well, nothing keeps running in the background.
#[derive(Clone, Debug)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(settings: &PollerSettings) -> Self {
        Self::new(settings.timeout()).with_interval(settings.interval())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stops the wait with `PollerError::Cancelled` once `cancel` is triggered
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn wait_until<F, Fut>(&self, mut predicate: F) -> Result<(), PollerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.try_wait_until(|| {
            let held = predicate();
            async move { Ok::<_, eyre::Report>(held.await) }
        })
        .await
    }

    pub async fn wait_until_eq<F, Fut, T>(
        &self,
        mut value_fn: F,
        expected: T,
        verbose: bool,
    ) -> Result<(), PollerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        T: PartialEq + Debug,
    {
        self.try_wait_until_eq(
            || {
                let value = value_fn();
                async move { Ok::<_, eyre::Report>(value.await) }
            },
            expected,
            verbose,
        )
        .await
    }

    /// Like `wait_until`, but the first predicate error aborts the wait
    pub async fn try_wait_until<F, Fut>(&self, predicate: F) -> Result<(), PollerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = eyre::Result<bool>>,
    {
        self.poll(predicate, |held| held).await
    }

    /// Like `wait_until_eq`, but the first error of `value_fn` aborts the wait
    pub async fn try_wait_until_eq<F, Fut, T>(
        &self,
        value_fn: F,
        expected: T,
        verbose: bool,
    ) -> Result<(), PollerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
        T: PartialEq + Debug,
    {
        let mut last_observed: Option<T> = None;
        self.poll(value_fn, |value| {
            let matched = value == expected;
            if verbose && last_observed.as_ref() != Some(&value) {
                info!(?value, ?expected, matched, "Observed value changed");
            }
            last_observed = Some(value);
            matched
        })
        .await
    }

    async fn poll<F, Fut, T, C>(&self, mut evaluate: F, mut condition: C) -> Result<(), PollerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
        C: FnMut(T) -> bool,
    {
        let start = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            let value = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(start, attempts)),
                value = evaluate() => value?,
            };

            if condition(value) {
                debug!(attempts, elapsed = ?start.elapsed(), "Condition met");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                warn!(attempts, ?elapsed, timeout = ?self.timeout, "Condition not met in time");
                return Err(PollerError::Timeout {
                    timeout: self.timeout,
                    elapsed,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(start, attempts)),
                _ = sleep(self.interval) => {}
            }
        }
    }

    fn cancelled(&self, start: Instant, attempts: u64) -> PollerError {
        let elapsed = start.elapsed();
        info!(attempts, ?elapsed, "Wait cancelled");
        PollerError::Cancelled { elapsed }
    }
}
