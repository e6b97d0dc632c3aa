//! Run many jobs at once, one independent poller each.

use futures::future::{join_all, try_join_all};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::FirecrawlApi;
use crate::config::PollConfig;
use crate::error::Error;
use crate::jobs::{JobOperation, JobRequest, OutputItem, StatusPoller, reduce};

/// What to do when one item cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemPolicy {
    /// Emit `{ "error": ... }` for the item and keep going.
    #[default]
    ContinueOnFail,
    /// Return the first validation or submission error.
    FailFast,
}

async fn run_item(
    api: &dyn FirecrawlApi,
    operation: JobOperation,
    payload: Value,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<OutputItem, Error> {
    let request = JobRequest::new(operation, payload)?;
    let result = StatusPoller::new(api, config.clone())
        .with_cancellation(cancel.child_token())
        .submit_and_await(&request)
        .await?;
    Ok(reduce(&result))
}

/// Submit every payload as `operation` and wait for all of them.
///
/// Output order matches input order. Timeouts and poll failures are
/// already structured items; only hard errors are subject to `policy`.
pub async fn run_batch(
    api: &dyn FirecrawlApi,
    operation: JobOperation,
    items: Vec<Value>,
    config: &PollConfig,
    policy: ItemPolicy,
    cancel: &CancellationToken,
) -> Result<Vec<OutputItem>, Error> {
    let total = items.len();
    let jobs = items
        .into_iter()
        .map(|payload| run_item(api, operation, payload, config, cancel));

    let out = match policy {
        // The first error drops the pending items and their pollers.
        ItemPolicy::FailFast => try_join_all(jobs).await?,
        ItemPolicy::ContinueOnFail => join_all(jobs)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|e| {
                    tracing::warn!(%operation, index, error = %e, "Batch item failed");
                    OutputItem::error(e.to_string())
                })
            })
            .collect(),
    };

    tracing::info!(%operation, total, "Batch finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::api::Endpoint;
    use crate::error::ApiError;

    /// Agent API keyed by prompt: "inline" answers at once, "job:<id>"
    /// returns a job that completes on the first poll, "reject" fails.
    /// Job ids starting with "slow" never leave `processing`.
    struct PromptApi {
        polls: Mutex<HashMap<String, u32>>,
    }

    #[async_trait]
    impl FirecrawlApi for PromptApi {
        async fn call(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ApiError> {
            match endpoint {
                Endpoint::Agent => {
                    let prompt = body
                        .and_then(|b| b["prompt"].as_str())
                        .unwrap_or_default()
                        .to_string();
                    if prompt == "reject" {
                        return Err(ApiError::Status {
                            endpoint: endpoint.to_string(),
                            status: 402,
                            body: "Payment required".into(),
                        });
                    }
                    match prompt.strip_prefix("job:") {
                        Some(id) => Ok(json!({"success": true, "id": id})),
                        None => Ok(json!({"success": true, "data": {"prompt": prompt}})),
                    }
                }
                Endpoint::AgentStatus(id) => {
                    *self.polls.lock().unwrap().entry(id.clone()).or_default() += 1;
                    if id.starts_with("slow") {
                        return Ok(json!({"status": "processing"}));
                    }
                    Ok(json!({"status": "completed", "data": {"id": id}}))
                }
                other => panic!("unexpected endpoint {other}"),
            }
        }
    }

    fn api() -> PromptApi {
        PromptApi {
            polls: Mutex::new(HashMap::new()),
        }
    }

    fn config() -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_millis(5),
            max_wait: Duration::from_secs(5),
            max_poll_retries: 1,
        }
    }

    #[tokio::test]
    async fn keeps_input_order_and_isolates_jobs() {
        let api = api();
        let items = vec![
            json!({"prompt": "job:A"}),
            json!({"prompt": "inline"}),
            json!({"prompt": "job:B"}),
        ];

        let out = run_batch(
            &api,
            JobOperation::Agent,
            items,
            &config(),
            ItemPolicy::FailFast,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].json["data"], json!({"id": "A"}));
        assert_eq!(out[1].json["data"], json!({"prompt": "inline"}));
        assert_eq!(out[2].json["data"], json!({"id": "B"}));

        let polls = api.polls.lock().unwrap();
        assert_eq!(polls.get("A"), Some(&1));
        assert_eq!(polls.get("B"), Some(&1));
    }

    #[tokio::test]
    async fn continue_on_fail_emits_error_items() {
        let items = vec![
            json!({"prompt": "reject"}),
            json!({"prompt": ""}),
            json!({"prompt": "inline"}),
        ];

        let out = run_batch(
            &api(),
            JobOperation::Agent,
            items,
            &config(),
            ItemPolicy::ContinueOnFail,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(out[0].json["error"].as_str().unwrap().contains("402"));
        assert!(out[1].json["error"].as_str().unwrap().contains("prompt"));
        assert_eq!(out[2].json["data"], json!({"prompt": "inline"}));
    }

    #[tokio::test]
    async fn fail_fast_returns_first_error() {
        let items = vec![json!({"prompt": "inline"}), json!({"prompt": "reject"})];

        let err = run_batch(
            &api(),
            JobOperation::Agent,
            items,
            &config(),
            ItemPolicy::FailFast,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Submission(_)));
    }

    #[tokio::test]
    async fn fail_fast_does_not_wait_for_running_jobs() {
        let items = vec![json!({"prompt": "job:slow1"}), json!({"prompt": "reject"})];
        let config = PollConfig {
            max_wait: Duration::from_secs(2),
            ..config()
        };
        let started = std::time::Instant::now();

        let err = run_batch(
            &api(),
            JobOperation::Agent,
            items,
            &config,
            ItemPolicy::FailFast,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Submission(_)));
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn continue_on_fail_keeps_slow_jobs_running() {
        let items = vec![json!({"prompt": "job:slow1"}), json!({"prompt": "reject"})];
        let config = PollConfig {
            max_wait: Duration::from_millis(50),
            ..config()
        };

        let out = run_batch(
            &api(),
            JobOperation::Agent,
            items,
            &config,
            ItemPolicy::ContinueOnFail,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out[0].json["state"], "timeout");
        assert!(out[1].json["error"].as_str().unwrap().contains("402"));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let out = run_batch(
            &api(),
            JobOperation::Agent,
            Vec::new(),
            &config(),
            ItemPolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }
}
