//! Terminal job results and their uniform output record.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::jobs::{JobOperation, JobState};

/// How a submitted job ended, from the caller's point of view.
///
/// None of these are errors: a workflow processing many items keeps going
/// and can query a timed-out or unreachable job later by id.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalResult {
    /// The job finished. `data` is the full status (or inline) payload.
    Completed { job_id: Option<String>, data: Value },
    /// The job itself reported failure.
    Failed { job_id: Option<String>, data: Value },
    /// The deadline passed while the job was still running.
    Timeout {
        job_id: String,
        operation: JobOperation,
        max_wait: Duration,
    },
    /// The status endpoint could not be reached within the retry budget.
    PollFailed {
        job_id: String,
        operation: JobOperation,
        last_error: String,
        attempts: u32,
    },
    /// The caller cancelled the poll.
    Cancelled {
        job_id: String,
        operation: JobOperation,
    },
}

impl TerminalResult {
    pub fn state(&self) -> JobState {
        match self {
            TerminalResult::Completed { .. } => JobState::Completed,
            TerminalResult::Failed { .. } => JobState::Failed,
            TerminalResult::Timeout { .. } => JobState::Timeout,
            TerminalResult::PollFailed { .. } => JobState::PollFailed,
            TerminalResult::Cancelled { .. } => JobState::Cancelled,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            TerminalResult::Completed { job_id, .. } | TerminalResult::Failed { job_id, .. } => {
                job_id.as_deref()
            }
            TerminalResult::Timeout { job_id, .. }
            | TerminalResult::PollFailed { job_id, .. }
            | TerminalResult::Cancelled { job_id, .. } => Some(job_id),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalResult::Completed { .. })
    }
}

/// One output item: `{ "json": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputItem {
    pub json: Value,
}

impl OutputItem {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            json: json!({ "error": message.into() }),
        }
    }
}

fn manual_hint(operation: JobOperation, job_id: &str) -> String {
    format!(
        "Job ID: {job_id}. You can check the status manually with \
         `firecrawl-flow status {operation} {job_id}`."
    )
}

/// Reduce a terminal result to its output record.
pub fn reduce(result: &TerminalResult) -> OutputItem {
    let json = match result {
        TerminalResult::Completed { data, .. } | TerminalResult::Failed { data, .. } => {
            data.clone()
        }
        TerminalResult::Timeout {
            job_id,
            operation,
            max_wait,
        } => json!({
            "state": JobState::Timeout,
            "jobId": job_id,
            "message": format!(
                "{operation} job timed out after {} seconds. {}",
                max_wait.as_secs(),
                manual_hint(*operation, job_id)
            ),
        }),
        TerminalResult::PollFailed {
            job_id,
            operation,
            last_error,
            attempts,
        } => json!({
            "state": JobState::PollFailed,
            "jobId": job_id,
            "error": last_error,
            "attempts": attempts,
            "message": format!(
                "Could not reach the {operation} status endpoint. {}",
                manual_hint(*operation, job_id)
            ),
        }),
        TerminalResult::Cancelled { job_id, operation } => json!({
            "state": JobState::Cancelled,
            "jobId": job_id,
            "message": format!(
                "Stopped waiting for the {operation} job. {}",
                manual_hint(*operation, job_id)
            ),
        }),
    };
    OutputItem { json }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn completed_passes_payload_through() {
        let result = TerminalResult::Completed {
            job_id: Some("J1".into()),
            data: json!({"status": "completed", "data": {"x": 1}}),
        };
        assert_eq!(
            reduce(&result),
            OutputItem {
                json: json!({"status": "completed", "data": {"x": 1}})
            }
        );
        assert!(result.is_success());
        assert_eq!(result.job_id(), Some("J1"));
    }

    #[test]
    fn failed_passes_payload_through() {
        let result = TerminalResult::Failed {
            job_id: Some("J1".into()),
            data: json!({"status": "failed", "error": "blocked"}),
        };
        assert_eq!(reduce(&result).json["error"], "blocked");
        assert_eq!(result.state(), JobState::Failed);
    }

    #[test]
    fn timeout_carries_id_and_hint() {
        let result = TerminalResult::Timeout {
            job_id: "J1".into(),
            operation: JobOperation::Agent,
            max_wait: Duration::from_secs(300),
        };
        let out = reduce(&result).json;
        assert_eq!(out["state"], "timeout");
        assert_eq!(out["jobId"], "J1");
        let message = out["message"].as_str().unwrap();
        assert!(message.contains("300 seconds"));
        assert!(message.contains("firecrawl-flow status agent J1"));
    }

    #[test]
    fn poll_failed_carries_last_error() {
        let result = TerminalResult::PollFailed {
            job_id: "c1".into(),
            operation: JobOperation::Crawl,
            last_error: "GET /crawl/c1 returned HTTP 503: down".into(),
            attempts: 4,
        };
        let out = reduce(&result).json;
        assert_eq!(out["state"], "poll_failed");
        assert_eq!(out["attempts"], 4);
        assert!(out["error"].as_str().unwrap().contains("503"));
        assert_eq!(result.state(), JobState::PollFailed);
    }

    #[test]
    fn output_item_serializes_with_json_key() {
        let item = OutputItem::error("boom");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"json": {"error": "boom"}})
        );
    }
}
