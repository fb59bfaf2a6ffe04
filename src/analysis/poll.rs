//! Bounded polling and cooperative cancellation.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{Error, Result};

/// How often and how long to poll a remote job.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second status check.
    pub interval: Duration,

    /// Upper bound for the delay between checks.
    pub max_interval: Duration,

    /// Factor applied to the delay after every check (1.0 = fixed interval).
    pub backoff: f64,

    /// Total time budget, or `None` to wait indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            backoff: 1.5,
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PollPolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the interval ceiling.
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Set the backoff factor. Values below 1.0 are treated as 1.0.
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = if backoff.is_finite() { backoff.max(1.0) } else { 1.0 };
        self
    }

    /// Set the total time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Poll without a time budget.
    pub fn unbounded(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Fixed-interval polling, no backoff.
    pub fn fixed(mut self) -> Self {
        self.backoff = 1.0;
        self
    }

    /// Delay that follows `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let ceiling = self.max_interval.max(self.interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .unwrap_or(ceiling)
            .min(ceiling)
    }
}

/// Receiving side of a cancellation signal.
///
/// Tokens are cheap to clone; all clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    signal: Receiver<()>,
}

/// Sending side of a cancellation signal. Cancels its tokens when dropped.
#[derive(Debug)]
pub struct CancelHandle {
    _signal: Sender<()>,
}

impl CancelHandle {
    /// Cancel all tokens tied to this handle.
    pub fn cancel(self) {
        drop(self);
    }
}

/// Create a connected handle and token.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (CancelHandle { _signal: tx }, CancelToken { signal: rx })
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self {
            signal: crossbeam_channel::never(),
        }
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        !matches!(self.signal.try_recv(), Err(TryRecvError::Empty))
    }

    /// Return [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early with [`Error::Cancelled`].
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.check();
        }
        match self.signal.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Ok(()),
            _ => Err(Error::Cancelled),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}
