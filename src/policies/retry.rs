//! # Fixed-delay retry policy.
//!
//! [`RetryPolicy`] wraps a single asynchronous operation with a bounded number of
//! attempts and a constant pause between them:
//! - [`RetryPolicy::attempts`] total attempts (the first call included);
//! - [`RetryPolicy::wait`] delay between two consecutive attempts.
//!
//! ## Rules
//! - Attempts run **sequentially**, never overlap.
//! - Any success returns immediately; no further attempts.
//! - After `attempts` consecutive failures the **last** error is returned.
//! - When every attempt fails, at least `(attempts - 1) × wait` elapses.
//! - `attempts == 0` behaves like `attempts == 1`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use provisor::RetryPolicy;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy::new(3, Duration::from_millis(1));
//! let res: Result<u32, &str> = policy
//!     .execute(|attempt| async move { if attempt < 2 { Err("flaky") } else { Ok(attempt) } })
//!     .await;
//! assert_eq!(res, Ok(2));
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time;

/// Bounded retry with fixed inter-attempt delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Delay between two consecutive attempts.
    pub wait: Duration,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `attempts = 3`;
    /// - `wait = 30s`.
    fn default() -> Self {
        Self {
            attempts: 3,
            wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and delay.
    pub fn new(attempts: u32, wait: Duration) -> Self {
        Self { attempts, wait }
    }

    /// Effective attempt budget (`0` is clamped to `1`).
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Runs `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(op, |_, _| {}).await
    }

    /// Same as [`execute`](Self::execute), but calls `on_retry(attempt, &err)`
    /// right before sleeping ahead of the next attempt.
    ///
    /// `on_retry` is never called for the final failed attempt.
    pub async fn execute_with<F, Fut, T, E, R>(&self, mut op: F, mut on_retry: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(u32, &E),
    {
        let max = self.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max => return Err(err),
                Err(err) => {
                    on_retry(attempt, &err);
                    time::sleep(self.wait).await;
                }
            }
        }
    }
}

/// Runs `op` under `policy`.
///
/// Free-function form of [`RetryPolicy::execute`].
pub async fn retry<F, Fut, T, E>(op: F, policy: RetryPolicy) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    policy.execute(op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl FnMut(u32) -> futures::future::Ready<Result<u32, String>> {
        move |_attempt| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                futures::future::ready(Err(format!("fail #{n}")))
            } else {
                futures::future::ready(Ok(n))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_wait() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(30));
        let start = Instant::now();

        let res = policy.execute(flaky(0, calls.clone())).await;

        assert_eq!(res, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_when_budget_covers_failures() {
        for k in 1..=4u32 {
            for attempts in 1..=4u32 {
                let calls = Arc::new(AtomicU32::new(0));
                let policy = RetryPolicy::new(attempts, Duration::from_millis(10));
                let start = Instant::now();

                let res = policy.execute(flaky(k - 1, calls.clone())).await;
                let used = calls.load(Ordering::SeqCst);

                if attempts >= k {
                    assert_eq!(res, Ok(k), "k={k} attempts={attempts}");
                    assert_eq!(used, k);
                } else {
                    assert_eq!(res, Err(format!("fail #{attempts}")), "k={k} attempts={attempts}");
                    assert_eq!(used, attempts);
                }
                assert!(start.elapsed() >= Duration::from_millis(10) * (used - 1));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_after_min_elapsed() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(30));
        let start = Instant::now();

        let res = policy.execute(flaky(u32::MAX, calls.clone())).await;

        assert_eq!(res, Err("fail #3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let res = retry(flaky(u32::MAX, calls.clone()), RetryPolicy::new(0, Duration::ZERO)).await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_retry_skips_final_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut seen = Vec::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(5));

        let _ = policy
            .execute_with(flaky(u32::MAX, calls), |attempt, err: &String| {
                seen.push((attempt, err.clone()))
            })
            .await;

        assert_eq!(
            seen,
            vec![(1, "fail #1".to_string()), (2, "fail #2".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_number_is_passed_in() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1));
        let mut numbers = Vec::new();

        let res: Result<(), ()> = policy
            .execute(|attempt| {
                numbers.push(attempt);
                async move { if attempt == 4 { Ok(()) } else { Err(()) } }
            })
            .await;

        assert!(res.is_ok());
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.wait, Duration::from_secs(30));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
