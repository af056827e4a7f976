//! Rate-limit-aware fetch loop
//!
//! Binance's request-weight window empirically resets on minute boundaries
//! of the *server's* clock, and the `Retry-After` header is unreliable on
//! some of the SAPI endpoints. So instead of a client-side backoff, a
//! rate-limited operation is retried after sleeping until the next server
//! minute rollover, with the server time queried fresh on every failure
//! (a cached or local clock would drift past the boundary).
//!
//! There is no retry cap for rate-limit failures: the window clears within
//! a bounded number of minutes, and every other failure class propagates
//! immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use tokio::time::sleep;
use tracing::warn;

use crate::binance::ApiError;

/// Source of the exchange server's current time.
///
/// Substituted with a deterministic fake in tests; implemented by the live
/// client via the `/api/v3/time` endpoint.
#[async_trait]
pub trait ServerClock {
    async fn server_time(&self) -> Result<DateTime<Utc>, ApiError>;
}

/// Duration from `server_now` until the start of the next minute on the
/// server's clock. Exactly on a boundary the full minute is returned: the
/// failure that prompted the wait happened in the minute that just ended.
pub fn until_next_minute(server_now: &DateTime<Utc>) -> Duration {
    // timestamp_subsec_millis can exceed 999 during a leap second; saturate
    // rather than underflow.
    let into_minute = u64::from(server_now.second()) * 1_000
        + u64::from(server_now.timestamp_subsec_millis());
    if into_minute == 0 {
        return Duration::from_secs(60);
    }
    Duration::from_millis(60_000u64.saturating_sub(into_minute))
}

/// Execute `op`, retrying after each rate-limit rejection once the server
/// clock rolls over to the next minute. Any other failure propagates
/// without sleeping.
pub async fn with_rate_limit_retry<C, F, Fut, T>(clock: &C, op: F) -> Result<T, ApiError>
where
    C: ServerClock,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                let server_now = clock.server_time().await?;
                let wait = until_next_minute(&server_now);
                warn!(
                    "rate limited (server time {}); sleeping {}ms until minute rollover",
                    server_now,
                    wait.as_millis()
                );
                sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 15, h, m, s).unwrap()
            + chrono::Duration::milliseconds(i64::from(ms))
    }

    #[test]
    fn test_until_next_minute_mid_minute() {
        assert_eq!(until_next_minute(&at(10, 15, 30, 0)), Duration::from_secs(30));
    }

    #[test]
    fn test_until_next_minute_with_millis() {
        assert_eq!(
            until_next_minute(&at(10, 16, 12, 500)),
            Duration::from_millis(47_500)
        );
    }

    #[test]
    fn test_until_next_minute_on_boundary_waits_full_minute() {
        assert_eq!(until_next_minute(&at(10, 0, 0, 0)), Duration::from_secs(60));
    }

    #[test]
    fn test_until_next_minute_just_before_boundary() {
        assert_eq!(
            until_next_minute(&at(10, 0, 59, 999)),
            Duration::from_millis(1)
        );
    }

    /// Clock that serves a scripted sequence of server times and counts
    /// how often it was consulted.
    struct FakeClock {
        times: Mutex<Vec<DateTime<Utc>>>,
        calls: AtomicUsize,
    }

    impl FakeClock {
        fn new(times: Vec<DateTime<Utc>>) -> Self {
            Self {
                times: Mutex::new(times),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServerClock for FakeClock {
        async fn server_time(&self) -> Result<DateTime<Utc>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut times = self.times.lock().unwrap();
            assert!(!times.is_empty(), "server_time consulted more than scripted");
            Ok(times.remove(0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_with_fresh_server_times() {
        // Fails rate-limited twice, then succeeds. Each wait must come from
        // a distinct server timestamp: 30s after the first failure, 47.5s
        // after the second.
        let clock = FakeClock::new(vec![at(10, 15, 30, 0), at(10, 16, 12, 500)]);
        let attempts = AtomicUsize::new(0);

        let started = tokio::time::Instant::now();
        let result = with_rate_limit_retry(&clock, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(ApiError::RateLimited("429: slow down".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(clock.calls(), 2);
        assert_eq!(
            started.elapsed(),
            Duration::from_millis(30_000 + 47_500)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_propagates_without_retry_or_sleep() {
        let clock = FakeClock::new(vec![]);
        let attempts = AtomicUsize::new(0);

        let started = tokio::time::Instant::now();
        let result: Result<(), ApiError> = with_rate_limit_retry(&clock, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Auth("401: bad key".into())) }
        })
        .await;

        assert!(result.unwrap_err().is_auth());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(clock.calls(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_error_propagates() {
        let clock = FakeClock::new(vec![]);

        let result: Result<(), ApiError> = with_rate_limit_retry(&clock, || async {
            Err(ApiError::Exchange {
                code: -1121,
                message: "Invalid symbol.".into(),
            })
        })
        .await;

        assert!(matches!(result, Err(ApiError::Exchange { code: -1121, .. })));
        assert_eq!(clock.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_passes_through_untouched() {
        let clock = FakeClock::new(vec![]);

        let result = with_rate_limit_retry(&clock, || async { Ok(42u32) }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(clock.calls(), 0);
    }
}
