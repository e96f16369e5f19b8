//! Bounded retry with exponential backoff for async operations.
//!
//! [`Retrier::retry`] runs a zero-argument async operation up to
//! `max_attempts` times. Between attempts it sleeps for
//! `delay * 2^(attempt - 1)` (or a flat `delay` with backoff disabled). The
//! loop can be stopped early through a [`CancellationToken`], both while an
//! attempt is in flight and while sleeping.
//!
//! [`RetryState`] exposes `is_retrying` / `attempt_count` so callers can
//! report a "retrying" status while the loop runs.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Callback invoked after every failed attempt with the 1-based attempt number.
pub type OnError<E> = Arc<dyn Fn(&E, u32) + Send + Sync>;

/// Callback invoked once when the final attempt fails.
pub type OnMaxAttemptsReached<E> = Arc<dyn Fn(&E) + Send + Sync>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub struct RetryOptions<E> {
    pub max_attempts: u32,
    pub delay: Duration,
    pub exponential_backoff: bool,
    pub on_error: Option<OnError<E>>,
    pub on_max_attempts_reached: Option<OnMaxAttemptsReached<E>>,
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
            exponential_backoff: true,
            on_error: None,
            on_max_attempts_reached: None,
        }
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            delay: self.delay,
            exponential_backoff: self.exponential_backoff,
            on_error: self.on_error.clone(),
            on_max_attempts_reached: self.on_max_attempts_reached.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("exponential_backoff", &self.exponential_backoff)
            .finish_non_exhaustive()
    }
}

/// Delay to wait after the given failed attempt (1-based) before the next one.
pub fn backoff_delay<E>(options: &RetryOptions<E>, attempt: u32) -> Duration {
    if !options.exponential_backoff {
        return options.delay;
    }
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    options.delay.saturating_mul(factor)
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure.
    #[error("Operation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// The cancellation token fired before the loop finished.
    #[error("Retry cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The last failure, if the loop ran to exhaustion.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::Cancelled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared, observable progress of the retry loops of one [`Retrier`].
///
/// Several loops may run at once on the same retrier; `is_retrying` stays
/// `true` as long as any of them is re-attempting after a failure.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    retrying_loops: Arc<AtomicUsize>,
    attempts: Arc<AtomicU32>,
}

impl RetryState {
    /// `true` while at least one loop is re-attempting after a failure.
    pub fn is_retrying(&self) -> bool {
        self.retrying_loops.load(Ordering::SeqCst) > 0
    }

    /// Attempts made by the most recently advanced loop.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Marks one loop as retrying until dropped. Dropping covers every exit,
/// including the loop's future being dropped mid-sleep.
struct RetryingGuard {
    loops: Arc<AtomicUsize>,
}

impl RetryingGuard {
    fn enter(state: &RetryState) -> Self {
        state.retrying_loops.fetch_add(1, Ordering::SeqCst);
        Self {
            loops: Arc::clone(&state.retrying_loops),
        }
    }
}

impl Drop for RetryingGuard {
    fn drop(&mut self) {
        self.loops.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Retrier
// ---------------------------------------------------------------------------

pub struct Retrier<E> {
    options: RetryOptions<E>,
    state: RetryState,
}

impl<E: fmt::Display> Retrier<E> {
    pub fn new(options: RetryOptions<E>) -> Self {
        Self {
            options,
            state: RetryState::default(),
        }
    }

    pub fn options(&self) -> &RetryOptions<E> {
        &self.options
    }

    /// Cloneable handle on this retrier's progress.
    pub fn state(&self) -> RetryState {
        self.state.clone()
    }

    /// Run `operation` until it succeeds, attempts are exhausted, or `cancel`
    /// fires.
    pub async fn retry<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0u32;
        let mut retrying: Option<RetryingGuard> = None;

        let result = loop {
            attempt += 1;
            self.state.attempts.store(attempt, Ordering::SeqCst);

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break Err(RetryError::Cancelled),
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => break Ok(value),
                Err(err) => err,
            };

            if let Some(on_error) = &self.options.on_error {
                on_error(&err, attempt);
            }

            if attempt >= max_attempts {
                if let Some(on_max) = &self.options.on_max_attempts_reached {
                    on_max(&err);
                }
                tracing::error!(
                    attempts = attempt,
                    error = %err,
                    "Operation failed after all retry attempts"
                );
                break Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }

            if retrying.is_none() {
                retrying = Some(RetryingGuard::enter(&self.state));
            }
            let wait = backoff_delay(&self.options, attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = wait.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => break Err(RetryError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        };

        drop(retrying);
        result
    }
}

/// One-shot convenience wrapper around [`Retrier::retry`] without
/// cancellation.
pub async fn retry<T, E, F, Fut>(operation: F, options: RetryOptions<E>) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retrier::new(options)
        .retry(operation, &CancellationToken::new())
        .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
