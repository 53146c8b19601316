// src/pipeline/retry.rs

//! Retry policy for transient page fetch failures.
//!
//! Remote pages are assumed to come back eventually, so production policies
//! never give up. Only [`AppError::TransientFetch`] is retried; any other
//! error returns immediately. Shutdown interrupts both the pending call and
//! the backoff wait.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Fixed wait between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever with a fixed wait.
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    /// Give up after `attempts` tries.
    pub fn attempts(attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(attempts.max(1)),
            backoff,
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Run `op` under `policy` until it succeeds.
pub async fn call_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        attempt = attempt.saturating_add(1);

        let outcome = tokio::select! {
            outcome = op() => outcome,
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => wait_before_retry(policy, cancel, attempt, e).await?,
        }
    }
}

/// Like [`call_with_policy`], lending `state` mutably to each attempt.
///
/// Page client calls need `&mut` access to the session, which a zero-argument
/// closure cannot hand out to the future it returns.
pub async fn call_with_state<S, T, F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    state: &mut S,
    mut op: F,
) -> Result<T>
where
    S: ?Sized + Send,
    F: FnMut(&mut S) -> BoxFuture<'_, Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        attempt = attempt.saturating_add(1);

        let outcome = tokio::select! {
            outcome = op(&mut *state) => outcome,
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => wait_before_retry(policy, cancel, attempt, e).await?,
        }
    }
}

/// Decide what to do with a failed attempt.
///
/// Returns `Ok(())` after the backoff when another attempt should follow,
/// otherwise the error to surface.
async fn wait_before_retry(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    attempt: u32,
    error: AppError,
) -> Result<()> {
    if !error.is_transient() || policy.exhausted(attempt) {
        return Err(error);
    }
    log::warn!(
        "Transient fetch failure (attempt {}), retrying in {:?}: {}",
        attempt,
        policy.backoff,
        error
    );
    tokio::select! {
        _ = tokio::time::sleep(policy.backoff) => Ok(()),
        _ = cancel.cancelled() => Err(AppError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    fn transient() -> AppError {
        AppError::transient("https://example.com", "tbody", "not rendered")
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::unbounded(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let value = call_with_policy(&policy, &cancel, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n <= 3 { Err(transient()) } else { Ok(n) } }
        })
        .await
        .unwrap();

        assert_eq!(value, 4);
        assert_eq!(calls.get(), 4);
        // Three failures, three waits.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_error_not_retried() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::unbounded(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let err = call_with_policy(&policy, &cancel, || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(AppError::malformed("https://example.com", "1 column")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::MalformedPage { .. }));
        assert_eq!(calls.get(), 1);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_returns_last_transient() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::attempts(2, Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let err = call_with_policy(&policy, &cancel, || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(transient()) }
        })
        .await
        .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let policy = RetryPolicy::unbounded(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = call_with_policy(&policy, &cancel, || async { Err::<(), _>(transient()) })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Cell::new(0u32);

        let err = call_with_policy(&RetryPolicy::unbounded(Duration::ZERO), &cancel, || {
            calls.set(calls.get() + 1);
            async { Ok(()) }
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_is_lent_to_each_attempt() {
        let mut failures_left = 2u32;
        let policy = RetryPolicy::unbounded(Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let value = call_with_state(&policy, &cancel, &mut failures_left, |left| {
            Box::pin(async move {
                if *left > 0 {
                    *left -= 1;
                    Err(transient())
                } else {
                    Ok("rendered")
                }
            })
        })
        .await
        .unwrap();

        assert_eq!(value, "rendered");
        assert_eq!(failures_left, 0);
    }
}
