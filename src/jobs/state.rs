//! Job state machine types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::jobs::JobOperation;

/// Lifecycle state of an asynchronous Firecrawl job.
///
/// `Pending` and `Processing` are the only non-terminal states. A job moves
/// forward through them into exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Timeout,
    PollFailed,
    Cancelled,
}

impl JobState {
    /// Map a `status` string from the API.
    ///
    /// Crawl and batch jobs report `scraping` while running and `cancelled`
    /// once stopped. Unknown strings are treated as a failed job rather than
    /// polled forever.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "pending" => JobState::Pending,
            "processing" | "scraping" => JobState::Processing,
            "completed" => JobState::Completed,
            _ => JobState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending | JobState::Processing)
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Processing => 1,
            _ => 2,
        }
    }

    /// Apply a fetched state without ever moving backwards.
    ///
    /// Terminal states are absorbing; `Pending` after `Processing` is ignored.
    pub fn advance(self, next: JobState) -> JobState {
        if self.is_terminal() || next.rank() < self.rank() {
            self
        } else {
            next
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Timeout => "timeout",
            JobState::PollFailed => "poll_failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a submitted job.
///
/// Not `Clone`: the poller takes the handle by value, so only one owner can
/// poll a given job.
#[derive(Debug)]
pub struct JobHandle {
    id: String,
    operation: JobOperation,
    submitted_at: DateTime<Utc>,
    started: Instant,
}

impl JobHandle {
    pub fn new(id: impl Into<String>, operation: JobOperation) -> Self {
        Self {
            id: id.into(),
            operation,
            submitted_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation(&self) -> JobOperation {
        self.operation
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Monotonic submission instant; the poll deadline is measured from here.
    pub(crate) fn started(&self) -> Instant {
        self.started
    }
}

/// One status snapshot as reported by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl JobStatus {
    /// Read a status endpoint payload. A missing `status` string is an error.
    pub fn from_payload(payload: &Value) -> Result<Self, String> {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| "status payload has no 'status' field".to_string())?;

        Ok(Self {
            state: JobState::from_wire(status),
            data: payload.get("data").cloned(),
            error: payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn wire_states() {
        assert_eq!(JobState::from_wire("pending"), JobState::Pending);
        assert_eq!(JobState::from_wire("processing"), JobState::Processing);
        assert_eq!(JobState::from_wire("scraping"), JobState::Processing);
        assert_eq!(JobState::from_wire("completed"), JobState::Completed);
        assert_eq!(JobState::from_wire("failed"), JobState::Failed);
        assert_eq!(JobState::from_wire("cancelled"), JobState::Failed);
        assert_eq!(JobState::from_wire("exploded"), JobState::Failed);
    }

    #[test]
    fn terminal_states_absorb() {
        for terminal in [
            JobState::Completed,
            JobState::Failed,
            JobState::Timeout,
            JobState::PollFailed,
            JobState::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert_eq!(terminal.advance(JobState::Processing), terminal);
            assert_eq!(terminal.advance(JobState::Completed), terminal);
        }
    }

    #[test]
    fn no_backward_transition() {
        assert_eq!(
            JobState::Processing.advance(JobState::Pending),
            JobState::Processing
        );
        assert_eq!(
            JobState::Pending.advance(JobState::Processing),
            JobState::Processing
        );
        assert_eq!(
            JobState::Processing.advance(JobState::Completed),
            JobState::Completed
        );
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(JobState::PollFailed).unwrap(),
            json!("poll_failed")
        );
        assert_eq!(JobState::PollFailed.to_string(), "poll_failed");
    }

    #[test]
    fn status_payload_parsing() {
        let status = JobStatus::from_payload(&json!({
            "status": "completed",
            "data": {"x": 1},
            "creditsUsed": 4
        }))
        .unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.data, Some(json!({"x": 1})));
        assert_eq!(status.error, None);

        let failed = JobStatus::from_payload(&json!({"status": "failed", "error": "boom"})).unwrap();
        assert_eq!(failed.error.as_deref(), Some("boom"));

        assert!(JobStatus::from_payload(&json!({"data": {}})).is_err());
        assert!(JobStatus::from_payload(&json!({"status": 3})).is_err());
    }

    #[test]
    fn handle_records_submission_time() {
        let before = Utc::now();
        let handle = JobHandle::new("J1", JobOperation::Agent);
        assert_eq!(handle.id(), "J1");
        assert_eq!(handle.operation(), JobOperation::Agent);
        assert!(handle.submitted_at() >= before);
    }
}
