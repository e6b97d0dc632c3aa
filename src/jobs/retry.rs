//! Status fetch with linear backoff for transient errors.
//!
//! Wraps a single poll cycle. Transient errors (`Request`, 5xx, `RateLimited`,
//! unreadable payloads) are retried up to `max_poll_retries` times; permanent
//! errors (other 4xx) end the cycle immediately. No retry wait extends past
//! the job deadline: a `Retry-After` hint is capped to the time left, and the
//! cycle gives up once the next wait would reach the deadline.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::FirecrawlApi;
use crate::config::PollConfig;
use crate::error::{ApiError, ApiErrorKind};
use crate::jobs::{JobHandle, JobStatus};

/// Result of one poll cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A readable status payload.
    Fetched {
        payload: Value,
        status: JobStatus,
        attempts: u32,
    },
    /// Every attempt failed, or a permanent error stopped the cycle.
    Exhausted { last_error: ApiError, attempts: u32 },
    /// The job deadline arrives before the next retry could run.
    DeadlineReached { last_error: ApiError, attempts: u32 },
    /// The token fired while waiting to retry.
    Cancelled { attempts: u32 },
}

/// Linear backoff: `poll_interval * (attempt + 1)`.
///
/// A server-suggested `Retry-After` replaces the computed delay.
pub(crate) fn poll_retry_delay(config: &PollConfig, attempt: u32, error: &ApiError) -> Duration {
    if let Some(hint) = error.retry_after() {
        return hint;
    }
    config.poll_interval.saturating_mul(attempt.saturating_add(1))
}

/// Sleep unless the token fires first. Returns `false` when cancelled.
pub(crate) async fn cancellable_sleep(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Fetch the job's status, retrying transient failures.
///
/// Makes at most `max_poll_retries + 1` strictly sequential attempts and
/// never sleeps past `deadline`.
pub async fn fetch_with_retry(
    api: &dyn FirecrawlApi,
    handle: &JobHandle,
    config: &PollConfig,
    deadline: Instant,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let mut attempt: u32 = 0;

    loop {
        let error = match api.fetch_status(handle).await {
            Ok(payload) => match JobStatus::from_payload(&payload) {
                Ok(status) => {
                    return FetchOutcome::Fetched {
                        payload,
                        status,
                        attempts: attempt + 1,
                    };
                }
                Err(reason) => ApiError::InvalidResponse {
                    endpoint: handle.operation().to_string(),
                    reason,
                },
            },
            Err(err) => err,
        };

        if error.kind() == ApiErrorKind::Permanent {
            tracing::warn!(
                job_id = handle.id(),
                error = %error,
                "Status fetch failed permanently"
            );
            return FetchOutcome::Exhausted {
                last_error: error,
                attempts: attempt + 1,
            };
        }

        if attempt >= config.max_poll_retries {
            return FetchOutcome::Exhausted {
                last_error: error,
                attempts: attempt + 1,
            };
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let suggested = poll_retry_delay(config, attempt, &error);
        let delay = suggested.min(remaining);
        if error.retry_after().is_some() && delay < suggested {
            tracing::warn!(
                job_id = handle.id(),
                suggested_ms = suggested.as_millis() as u64,
                remaining_ms = remaining.as_millis() as u64,
                "Rate-limit retry_after capped to remaining budget"
            );
        }
        if delay >= remaining {
            tracing::warn!(
                job_id = handle.id(),
                attempt = attempt + 1,
                remaining_ms = remaining.as_millis() as u64,
                error = %error,
                "Job deadline reached before next status retry"
            );
            return FetchOutcome::DeadlineReached {
                last_error: error,
                attempts: attempt + 1,
            };
        }

        tracing::warn!(
            job_id = handle.id(),
            attempt = attempt + 1,
            max_retries = config.max_poll_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying status fetch after transient error"
        );

        if !cancellable_sleep(cancel, delay).await {
            return FetchOutcome::Cancelled {
                attempts: attempt + 1,
            };
        }
        attempt += 1;
    }
}
