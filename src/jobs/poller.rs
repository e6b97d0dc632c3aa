//! Status poller: waits for a submitted job to reach a terminal state.
//!
//! The loop is the only suspension point in the crate. It checks the
//! deadline, sleeps for `poll_interval` (never past the deadline), then runs
//! one poll cycle (see [`fetch_with_retry`]). Deadline convention: a job is
//! timed out once `now >= submitted + max_wait`, so `max_wait = 0` times out
//! before the first fetch. Retry waits inside a cycle are bounded by the same
//! deadline.

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::FirecrawlApi;
use crate::config::PollConfig;
use crate::error::Error;
use crate::jobs::retry::{FetchOutcome, cancellable_sleep, fetch_with_retry};
use crate::jobs::{
    JobHandle, JobOperation, JobRequest, JobState, Submission, TerminalResult, submit,
};

/// Polls one job at a time to completion.
pub struct StatusPoller<'a> {
    api: &'a dyn FirecrawlApi,
    config: PollConfig,
    cancel: CancellationToken,
}

impl<'a> StatusPoller<'a> {
    pub fn new(api: &'a dyn FirecrawlApi, config: PollConfig) -> Self {
        Self {
            api,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Submit `request` and wait for the job to finish.
    ///
    /// Only validation and submission failures are errors; everything after
    /// a job id exists comes back as a [`TerminalResult`].
    pub async fn submit_and_await(&self, request: &JobRequest) -> Result<TerminalResult, Error> {
        let submission = submit(self.api, request).await?;
        Ok(self.run(submission).await)
    }

    /// Drive a submission to a terminal result.
    pub async fn run(&self, submission: Submission) -> TerminalResult {
        match submission {
            Submission::Terminal(data) => TerminalResult::Completed { job_id: None, data },
            Submission::Pending {
                handle,
                initial_state,
                response,
            } => self.poll(handle, initial_state, response).await,
        }
    }

    /// Poll `handle` until it leaves `pending`/`processing`.
    ///
    /// Takes the handle by value: a job has exactly one poller.
    pub async fn poll(
        &self,
        handle: JobHandle,
        initial_state: JobState,
        initial_payload: Value,
    ) -> TerminalResult {
        let job_id = handle.id().to_string();
        let operation = handle.operation();
        let deadline = handle.started() + self.config.max_wait;

        let mut state = initial_state;
        let mut payload = initial_payload;
        let mut polls: u32 = 0;

        while !state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return self.timed_out(job_id, operation, polls);
            }

            let nap = self.config.poll_interval.min(deadline - now);
            if !cancellable_sleep(&self.cancel, nap).await {
                tracing::info!(job_id = %job_id, %operation, polls, "Poll cancelled");
                return TerminalResult::Cancelled { job_id, operation };
            }
            if Instant::now() >= deadline {
                continue;
            }

            let outcome =
                fetch_with_retry(self.api, &handle, &self.config, deadline, &self.cancel).await;
            match outcome {
                FetchOutcome::Fetched {
                    payload: fetched,
                    status,
                    attempts,
                } => {
                    polls += 1;
                    let next = state.advance(status.state);
                    tracing::debug!(
                        job_id = %job_id,
                        %operation,
                        poll = polls,
                        attempts,
                        reported = %status.state,
                        state = %next,
                        "Polled job status"
                    );
                    state = next;
                    payload = fetched;
                }
                FetchOutcome::Exhausted {
                    last_error,
                    attempts,
                } => {
                    tracing::warn!(
                        job_id = %job_id,
                        %operation,
                        attempts,
                        error = %last_error,
                        "Giving up on status endpoint"
                    );
                    return TerminalResult::PollFailed {
                        job_id,
                        operation,
                        last_error: last_error.to_string(),
                        attempts,
                    };
                }
                FetchOutcome::DeadlineReached {
                    last_error,
                    attempts,
                } => {
                    polls += 1;
                    tracing::debug!(
                        job_id = %job_id,
                        attempts,
                        error = %last_error,
                        "Deadline reached during status retries"
                    );
                    return self.timed_out(job_id, operation, polls);
                }
                FetchOutcome::Cancelled { .. } => {
                    tracing::info!(job_id = %job_id, %operation, polls, "Poll cancelled");
                    return TerminalResult::Cancelled { job_id, operation };
                }
            }
        }

        tracing::info!(job_id = %job_id, %operation, polls, %state, "Job finished");
        if state == JobState::Completed {
            TerminalResult::Completed {
                job_id: Some(job_id),
                data: payload,
            }
        } else {
            TerminalResult::Failed {
                job_id: Some(job_id),
                data: payload,
            }
        }
    }

    fn timed_out(&self, job_id: String, operation: JobOperation, polls: u32) -> TerminalResult {
        tracing::warn!(
            job_id = %job_id,
            %operation,
            polls,
            max_wait_secs = self.config.max_wait.as_secs(),
            "Job did not finish before the deadline"
        );
        TerminalResult::Timeout {
            job_id,
            operation,
            max_wait: self.config.max_wait,
        }
    }
}

/// Submit and await with a fresh poller. No cancellation beyond the deadline.
pub async fn submit_and_await(
    api: &dyn FirecrawlApi,
    request: &JobRequest,
    config: &PollConfig,
) -> Result<TerminalResult, Error> {
    StatusPoller::new(api, config.clone())
        .submit_and_await(request)
        .await
}
