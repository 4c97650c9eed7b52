//! Fixed-window rate limiter with blocking admission.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{RegistryError, Result};

/// Record of a reserved slot, returned by [`RateLimiter::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Position of this call within its window, starting at 1
    pub slot: u32,
    /// Time spent between calling `acquire` and the reservation
    pub waited: Duration,
    /// Start of the window the slot was reserved in
    pub window_start: Instant,
    /// When the slot was reserved
    pub admitted_at: Instant,
}

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

/// Admission control allowing at most `limit` calls per fixed window.
///
/// Callers that find the window exhausted are suspended until it resets.
/// Only one caller at a time runs the check, wait and reserve sequence: a
/// caller sleeping out the window holds its turn, and every other caller
/// queues behind it in no particular order. Once the limit is hit,
/// admissions therefore resolve one at a time, aligned to window resets.
///
/// Resets are fixed-window, so up to twice the limit may be admitted across
/// a window boundary.
pub struct RateLimiter {
    /// Serializes admission sequences, held across the suspension
    turn: tokio::sync::Mutex<()>,
    /// Window bookkeeping, only ever locked briefly
    state: Mutex<WindowState>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` calls per `window`.
    pub fn new(limit: u32, window: impl Into<Duration>) -> Result<Self> {
        let window = window.into();
        if limit == 0 {
            return Err(RegistryError::Config(
                "request limit must be greater than zero".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(RegistryError::Config(
                "rate limit window must be longer than zero".to_string(),
            ));
        }

        Ok(Self {
            turn: tokio::sync::Mutex::new(()),
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                count: 0,
            }),
            limit,
            window,
        })
    }

    /// Wait until a slot is available in the current window and reserve it.
    ///
    /// Dropping the returned future before it completes releases the turn
    /// and leaves the count untouched.
    pub async fn acquire(&self) -> Admission {
        let called_at = Instant::now();
        let _turn = self.turn.lock().await;

        let deadline = {
            let mut state = self.state.lock();
            let now = Instant::now();

            if now.duration_since(state.window_start) >= self.window {
                debug!(previous_count = state.count, "Rate limit window rolled over");
                state.window_start = now;
                state.count = 0;
            }

            if state.count < self.limit {
                return self.reserve(&mut state, called_at);
            }
            state.window_start + self.window
        };

        let wait = deadline.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(
                limit = self.limit,
                wait_ms = wait.as_millis() as u64,
                "Rate limit reached, suspending until the window resets"
            );
            tokio::time::sleep_until(deadline).await;
        }

        // Reset unconditionally after the wait, even if woken early.
        let mut state = self.state.lock();
        state.window_start = Instant::now();
        state.count = 0;
        self.reserve(&mut state, called_at)
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`RegistryError::Cancelled`] once `token` is cancelled.
    pub async fn acquire_with_cancel(&self, token: &CancellationToken) -> Result<Admission> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Rate limit wait cancelled");
                Err(RegistryError::Cancelled)
            }
            admission = self.acquire() => Ok(admission),
        }
    }

    fn reserve(&self, state: &mut WindowState, called_at: Instant) -> Admission {
        state.count += 1;
        let admitted_at = Instant::now();

        trace!(
            slot = state.count,
            limit = self.limit,
            "Rate limit slot reserved"
        );

        Admission {
            slot: state.count,
            waited: admitted_at.duration_since(called_at),
            window_start: state.window_start,
            admitted_at,
        }
    }

    /// Get the number of calls admitted per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Get the window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the number of slots used in the current window.
    ///
    /// An expired window reads as empty; observing never rolls it over.
    pub fn count(&self) -> u32 {
        let state = self.state.lock();
        if state.window_start.elapsed() >= self.window {
            0
        } else {
            state.count
        }
    }

    /// Get the number of slots still free in the current window.
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count())
    }

    /// Get the duration until the current window resets.
    pub fn duration_until_reset(&self) -> Duration {
        let state = self.state.lock();
        self.window.saturating_sub(state.window_start.elapsed())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("count", &self.count())
            .finish()
    }
}
