//! Job requests and the submission step.

use std::fmt;

use serde_json::{Map, Value};

use crate::api::{Endpoint, FirecrawlApi};
use crate::error::{SubmissionError, ValidationError};
use crate::jobs::{JobHandle, JobState};
use crate::urls::{optional_urls, require_urls};

/// Long-running operation a [`JobRequest`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum JobOperation {
    /// Single page scrape. Always answers inline.
    Scrape,
    /// Agent extraction (`/agent`).
    Agent,
    Crawl,
    BatchScrape,
    /// Structured extraction (`/extract`).
    Extract,
}

impl JobOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOperation::Scrape => "scrape",
            JobOperation::Agent => "agent",
            JobOperation::Crawl => "crawl",
            JobOperation::BatchScrape => "batch-scrape",
            JobOperation::Extract => "extract",
        }
    }

    pub fn submit_endpoint(&self) -> Endpoint {
        match self {
            JobOperation::Scrape => Endpoint::Scrape,
            JobOperation::Agent => Endpoint::Agent,
            JobOperation::Crawl => Endpoint::Crawl,
            JobOperation::BatchScrape => Endpoint::BatchScrape,
            JobOperation::Extract => Endpoint::Extract,
        }
    }

    /// Status endpoint for a job id, if this operation can be polled.
    pub fn status_endpoint(&self, id: &str) -> Option<Endpoint> {
        let id = id.to_string();
        match self {
            JobOperation::Scrape => None,
            JobOperation::Agent => Some(Endpoint::AgentStatus(id)),
            JobOperation::Crawl => Some(Endpoint::CrawlStatus(id)),
            JobOperation::BatchScrape => Some(Endpoint::BatchScrapeStatus(id)),
            JobOperation::Extract => Some(Endpoint::ExtractStatus(id)),
        }
    }

    pub fn errors_endpoint(&self, id: &str) -> Option<Endpoint> {
        match self {
            JobOperation::Crawl => Some(Endpoint::CrawlErrors(id.to_string())),
            JobOperation::BatchScrape => Some(Endpoint::BatchScrapeErrors(id.to_string())),
            _ => None,
        }
    }

    pub fn cancel_endpoint(&self, id: &str) -> Option<Endpoint> {
        match self {
            JobOperation::Crawl => Some(Endpoint::CancelCrawl(id.to_string())),
            JobOperation::BatchScrape => Some(Endpoint::CancelBatchScrape(id.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for JobOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated job submission. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    operation: JobOperation,
    payload: Value,
}

impl JobRequest {
    /// Validate and normalize a request body for `operation`.
    ///
    /// URL list fields are normalized in place: batch scrape and extract
    /// require at least one URL, the agent's `urls` is dropped when empty.
    pub fn new(operation: JobOperation, payload: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut body) = payload else {
            return Err(ValidationError::InvalidValue {
                field: "payload".to_string(),
                reason: "must be a JSON object".to_string(),
            });
        };

        match operation {
            JobOperation::Scrape | JobOperation::Crawl => {
                require_non_empty_str(&body, "url")?;
            }
            JobOperation::BatchScrape | JobOperation::Extract => {
                let urls = require_urls(body.get("urls"), "urls")?;
                body.insert("urls".to_string(), Value::from(urls));
            }
            JobOperation::Agent => {
                require_non_empty_str(&body, "prompt")?;
                match optional_urls(body.get("urls")) {
                    Some(urls) => {
                        body.insert("urls".to_string(), Value::from(urls));
                    }
                    None => {
                        body.remove("urls");
                    }
                }
            }
        }

        Ok(Self {
            operation,
            payload: Value::Object(body),
        })
    }

    pub fn operation(&self) -> JobOperation {
        self.operation
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

fn require_non_empty_str(body: &Map<String, Value>, field: &str) -> Result<(), ValidationError> {
    match body.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::MissingField {
            field: field.to_string(),
        }),
    }
}

/// What the submission endpoint answered.
#[derive(Debug)]
pub enum Submission {
    /// A fully realized result; nothing to poll.
    Terminal(Value),
    /// A job id; the status endpoint must be polled.
    Pending {
        handle: JobHandle,
        initial_state: JobState,
        response: Value,
    },
}

impl Submission {
    /// Interpret a submission response body.
    ///
    /// A body without a string `id` is terminal. Otherwise the job starts in
    /// the body's `status`, or `processing` when the API omitted it.
    pub fn from_response(operation: JobOperation, response: Value) -> Self {
        if operation.status_endpoint("").is_none() {
            return Submission::Terminal(response);
        }

        let Some(id) = response
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
        else {
            return Submission::Terminal(response);
        };

        let initial_state = response
            .get("status")
            .and_then(Value::as_str)
            .map(JobState::from_wire)
            .unwrap_or(JobState::Processing);

        Submission::Pending {
            handle: JobHandle::new(id, operation),
            initial_state,
            response,
        }
    }
}

/// Send the request once and interpret the answer.
pub async fn submit(
    api: &dyn FirecrawlApi,
    request: &JobRequest,
) -> Result<Submission, SubmissionError> {
    let operation = request.operation();
    let response = api
        .submit(request)
        .await
        .map_err(|source| SubmissionError::Rejected {
            operation: operation.to_string(),
            source,
        })?;

    let submission = Submission::from_response(operation, response);
    match &submission {
        Submission::Terminal(_) => {
            tracing::debug!(%operation, "Submission answered inline");
        }
        Submission::Pending {
            handle,
            initial_state,
            ..
        } => {
            tracing::info!(
                %operation,
                job_id = handle.id(),
                state = %initial_state,
                "Job submitted"
            );
        }
    }
    Ok(submission)
}
