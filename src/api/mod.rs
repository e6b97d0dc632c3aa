//! Firecrawl REST API access.
//!
//! [`FirecrawlApi`] is the seam the job poller and the agent tools are
//! written against. [`FirecrawlClient`] is the `reqwest` implementation;
//! tests substitute scripted implementations.

mod client;
mod endpoint;

pub use client::FirecrawlClient;
pub use endpoint::Endpoint;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::jobs::{JobHandle, JobRequest};

#[async_trait]
pub trait FirecrawlApi: Send + Sync {
    /// Issue one request. `body` is ignored for endpoints without one.
    async fn call(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ApiError>;

    /// Send the initial job submission. Exactly one call, never retried.
    async fn submit(&self, request: &JobRequest) -> Result<Value, ApiError> {
        self.call(&request.operation().submit_endpoint(), Some(request.payload()))
            .await
    }

    /// Fetch the current status payload of a submitted job.
    async fn fetch_status(&self, handle: &JobHandle) -> Result<Value, ApiError> {
        let endpoint = handle
            .operation()
            .status_endpoint(handle.id())
            .ok_or_else(|| ApiError::InvalidResponse {
                endpoint: handle.operation().to_string(),
                reason: "operation has no status endpoint".to_string(),
            })?;
        self.call(&endpoint, None).await
    }
}
