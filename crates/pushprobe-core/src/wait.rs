//! Bounded polling for asynchronous, externally triggered UI state.
//!
//! The device offers no callback when a notification lands, so arrival is
//! detected by re-evaluating a predicate at a fixed interval until it holds
//! or the budget runs out. [`poll_until`] is polarity-agnostic: a
//! [`PollOutcome::TimedOut`] is a failure when presence was expected and a
//! pass when absence was expected, and the caller decides which.
//!
//! ```
//! use std::convert::Infallible;
//! use pushprobe_core::wait::{poll_until, PollOutcome, WaitOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let outcome = poll_until(WaitOptions::new(0, 10), || async { Ok::<_, Infallible>(true) })
//!     .await
//!     .unwrap();
//! assert_eq!(outcome, PollOutcome::Satisfied);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

/// Default interval between predicate evaluations (1 second).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default polling budget (60 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate held within the budget.
    Satisfied,
    /// The budget elapsed without the predicate holding.
    TimedOut,
}

impl PollOutcome {
    /// Returns true for [`PollOutcome::Satisfied`].
    pub fn is_satisfied(self) -> bool {
        self == PollOutcome::Satisfied
    }
}

/// Budget and interval of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total time budget.
    pub timeout: Duration,
    /// Fixed sleep between evaluations.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS)
    }
}

impl WaitOptions {
    /// Creates options from millisecond values.
    pub fn new(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }
}

/// Re-evaluates `predicate` every `interval` until it returns `true` or
/// `timeout` has elapsed.
///
/// The predicate always runs at least once, so a zero timeout still performs
/// a single check. There is no backoff and no early cancellation. An error
/// from the predicate ends the poll immediately and is returned as-is.
pub async fn poll_until<F, Fut, E>(options: WaitOptions, mut predicate: F) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if predicate().await? {
            debug!(
                attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "poll satisfied"
            );
            return Ok(PollOutcome::Satisfied);
        }

        if start.elapsed() >= options.timeout {
            debug!(
                attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "poll timed out"
            );
            return Ok(PollOutcome::TimedOut);
        }

        sleep(options.interval).await;
    }
}
