//! Uniform timeout / retry / backoff / cancellation for external calls.
//!
//! Both the classification oracle and the duplicate judge go through
//! [`with_resilience`]; call sites never hand-roll their own loops.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use smol::Timer;

use crate::cancel::CancelToken;

/// Failure of a single external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The call did not complete within the policy timeout.
    Timeout(Duration),
    /// Network / server-side failure. Worth retrying.
    Transport(String),
    /// The collaborator refused the request (bad input, auth). Not retried.
    Rejected(String),
    /// The caller's token was cancelled while the call was in flight.
    Cancelled,
}

impl CallError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "call timed out after {}ms", d.as_millis()),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Rejected(msg) => write!(f, "request rejected: {msg}"),
            Self::Cancelled => write!(f, "call cancelled"),
        }
    }
}

impl std::error::Error for CallError {}

/// Timeout and retry settings for one kind of external call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResiliencePolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Additional attempts after the first one.
    pub retries: u32,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub backoff_multiplier: u32,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
            backoff_multiplier: 2,
        }
    }
}

impl ResiliencePolicy {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_max = max;
        self
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.backoff_multiplier.max(1))
            .min(self.backoff_max)
    }
}

/// Run `call` under `policy`: each attempt races the call against the timeout
/// and the cancel token; retryable failures are retried with exponential backoff.
///
/// Cancellation is never retried and is observed during backoff sleeps too.
pub async fn with_resilience<T, F, Fut>(
    label: &str,
    policy: &ResiliencePolicy,
    cancel: &CancelToken,
    mut call: F,
) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let mut attempt: u32 = 0;
    let mut delay = policy.backoff_initial;

    loop {
        if cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }

        match run_attempt(call(), policy.timeout, cancel).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.retries => {
                attempt += 1;
                log::warn!(
                    "{label}: attempt {attempt}/{} failed ({err}), retrying in {}ms",
                    policy.retries + 1,
                    delay.as_millis()
                );
                if !sleep_unless_cancelled(delay, cancel).await {
                    return Err(CallError::Cancelled);
                }
                delay = policy.next_backoff(delay);
            }
            Err(err) => {
                log::debug!("{label}: giving up after {} attempt(s): {err}", attempt + 1);
                return Err(err);
            }
        }
    }
}

async fn run_attempt<T, Fut>(fut: Fut, timeout: Duration, cancel: &CancelToken) -> Result<T, CallError>
where
    Fut: Future<Output = Result<T, CallError>>,
{
    let cancelled = async {
        cancel.cancelled().await;
        Err(CallError::Cancelled)
    };
    let expired = async {
        Timer::after(timeout).await;
        Err(CallError::Timeout(timeout))
    };
    // Cancellation is polled first so a cancelled token wins over a ready call.
    smol::future::or(cancelled, smol::future::or(fut, expired)).await
}

/// Returns false if the token was cancelled before the delay elapsed.
async fn sleep_unless_cancelled(delay: Duration, cancel: &CancelToken) -> bool {
    smol::future::or(
        async {
            cancel.cancelled().await;
            false
        },
        async {
            Timer::after(delay).await;
            true
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(retries: u32) -> ResiliencePolicy {
        ResiliencePolicy::new(Duration::from_millis(50), retries)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn succeeds_first_try() {
        let cancel = CancelToken::new();
        let out = smol::block_on(with_resilience("t", &fast_policy(2), &cancel, || async {
            Ok::<_, CallError>(7)
        }));
        assert_eq!(out, Ok(7));
    }

    #[test]
    fn retries_transport_errors_then_succeeds() {
        let cancel = CancelToken::new();
        let calls = Cell::new(0);
        let out = smol::block_on(with_resilience("t", &fast_policy(2), &cancel, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(CallError::Transport("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        }));
        assert_eq!(out, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_retries_exhausted() {
        let cancel = CancelToken::new();
        let calls = Cell::new(0);
        let out: Result<(), _> = smol::block_on(with_resilience("t", &fast_policy(1), &cancel, || {
            calls.set(calls.get() + 1);
            async { Err(CallError::Transport("down".into())) }
        }));
        assert_eq!(out, Err(CallError::Transport("down".into())));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn rejected_is_not_retried() {
        let cancel = CancelToken::new();
        let calls = Cell::new(0);
        let out: Result<(), _> = smol::block_on(with_resilience("t", &fast_policy(3), &cancel, || {
            calls.set(calls.get() + 1);
            async { Err(CallError::Rejected("bad request".into())) }
        }));
        assert!(matches!(out, Err(CallError::Rejected(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn pending_call_times_out() {
        let cancel = CancelToken::new();
        let out: Result<(), _> = smol::block_on(with_resilience("t", &fast_policy(0), &cancel, || {
            smol::future::pending::<Result<(), CallError>>()
        }));
        assert_eq!(out, Err(CallError::Timeout(Duration::from_millis(50))));
    }

    #[test]
    fn cancelled_token_aborts_before_calling() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let calls = Cell::new(0);
        let out: Result<(), _> = smol::block_on(with_resilience("t", &fast_policy(3), &cancel, || {
            calls.set(calls.get() + 1);
            async { Ok(()) }
        }));
        assert_eq!(out, Err(CallError::Cancelled));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = ResiliencePolicy::default()
            .with_backoff(Duration::from_millis(400), Duration::from_millis(1_000));
        let d1 = policy.next_backoff(policy.backoff_initial);
        let d2 = policy.next_backoff(d1);
        assert_eq!(d1, Duration::from_millis(800));
        assert_eq!(d2, Duration::from_millis(1_000));
    }
}
