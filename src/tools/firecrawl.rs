//! Firecrawl operations exposed as agent tools.
//!
//! Scrape, map and search answer in a single request. Crawl and agent jobs
//! are submitted and awaited through [`StatusPoller`], so the model gets the
//! finished result (or a structured timeout carrying the job id) instead of
//! an id it would have to poll itself.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{Endpoint, FirecrawlApi};
use crate::config::PollConfig;
use crate::error::{ApiError, Error, SubmissionError};
use crate::jobs::{JobOperation, JobRequest, StatusPoller, reduce};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, require_str};

/// Keys the host adds to tool input that must not reach the API.
const HOST_METADATA_KEYS: [&str; 2] = ["tool", "toolCallId"];

/// Headroom on top of `max_wait` for submission and the final fetch.
const POLL_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Scrape,
    Map,
    Search,
    Crawl,
    Agent,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Scrape,
        ToolKind::Map,
        ToolKind::Search,
        ToolKind::Crawl,
        ToolKind::Agent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Scrape => "scrape",
            ToolKind::Map => "map",
            ToolKind::Search => "search",
            ToolKind::Crawl => "crawl",
            ToolKind::Agent => "agent",
        }
    }

    /// The parameter that must be present before anything is sent.
    fn required_param(&self) -> &'static str {
        match self {
            ToolKind::Scrape | ToolKind::Map | ToolKind::Crawl => "url",
            ToolKind::Search => "query",
            ToolKind::Agent => "prompt",
        }
    }

    fn default_description(&self) -> &'static str {
        match self {
            ToolKind::Scrape => {
                "Scrape content from a single URL. Best when you know exactly which page \
                 holds the information. Not for multiple pages (use crawl) or unknown pages \
                 (use search). Returns markdown, HTML or the other requested formats."
            }
            ToolKind::Map => {
                "Map a website to discover its indexed URLs. Best for finding the right page \
                 before scraping it. Returns an array of URLs found on the site."
            }
            ToolKind::Search => {
                "Search the web and optionally scrape the results. Best when you don't know \
                 which site has the information. Search without scrapeOptions first, then \
                 scrape the relevant results. Returns an array of search results."
            }
            ToolKind::Crawl => {
                "Crawl a website and scrape every discovered page. Best for broad coverage of \
                 related pages. Keep limit and maxDiscoveryDepth low to avoid long runs. \
                 Waits for the crawl to finish and returns the scraped pages."
            }
            ToolKind::Agent => {
                "Run the Firecrawl research agent on a natural language prompt, optionally \
                 seeded with URLs. Waits for the agent to finish and returns its findings."
            }
        }
    }

    fn parameters_schema(&self) -> Value {
        match self {
            ToolKind::Scrape => json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to scrape"},
                    "formats": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "enum": ["markdown", "html", "rawHtml", "links", "screenshot"]
                        },
                        "description": "Output formats to return (default: [\"markdown\"])"
                    },
                    "onlyMainContent": {
                        "type": "boolean",
                        "description": "Only return the main content, excluding headers, navs and footers"
                    },
                    "includeTags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Only include these tags, classes and ids"
                    },
                    "excludeTags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tags, classes and ids to remove"
                    },
                    "waitFor": {
                        "type": "number",
                        "description": "Milliseconds to wait for the page to load"
                    },
                    "mobile": {"type": "boolean", "description": "Emulate a mobile device"}
                },
                "required": ["url"]
            }),
            ToolKind::Map => json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The base URL to start mapping from"},
                    "search": {"type": "string", "description": "Filter discovered URLs by this query"},
                    "sitemap": {
                        "type": "string",
                        "enum": ["include", "skip", "only"],
                        "description": "How to use the sitemap (default: include)"
                    },
                    "includeSubdomains": {"type": "boolean"},
                    "limit": {"type": "number", "description": "Maximum number of links to return"},
                    "ignoreQueryParameters": {"type": "boolean"}
                },
                "required": ["url"]
            }),
            ToolKind::Search => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "description": "The search query"},
                    "limit": {"type": "number", "description": "Maximum number of results"},
                    "tbs": {"type": "string", "description": "Time-based search parameter"},
                    "filter": {"type": "string"},
                    "location": {"type": "string", "description": "Location for search results"},
                    "scrapeOptions": {
                        "type": "object",
                        "properties": {
                            "formats": {"type": "array", "items": {"type": "string"}},
                            "onlyMainContent": {"type": "boolean"},
                            "waitFor": {"type": "number"}
                        }
                    }
                },
                "required": ["query"]
            }),
            ToolKind::Crawl => json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Starting URL for the crawl"},
                    "prompt": {"type": "string", "description": "Natural language crawl instructions"},
                    "includePaths": {"type": "array", "items": {"type": "string"}},
                    "excludePaths": {"type": "array", "items": {"type": "string"}},
                    "maxDiscoveryDepth": {"type": "number"},
                    "limit": {"type": "number", "description": "Maximum number of pages"},
                    "allowExternalLinks": {"type": "boolean"},
                    "allowSubdomains": {"type": "boolean"},
                    "scrapeOptions": {"type": "object"}
                },
                "required": ["url"]
            }),
            ToolKind::Agent => json!({
                "type": "object",
                "properties": {
                    "prompt": {"type": "string", "description": "What the agent should find"},
                    "urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Optional URLs to start from"
                    },
                    "schema": {"type": "object", "description": "JSON schema for the result"}
                },
                "required": ["prompt"]
            }),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One Firecrawl operation as a [`Tool`].
pub struct FirecrawlTool {
    kind: ToolKind,
    name: String,
    description: Option<String>,
    api: Arc<dyn FirecrawlApi>,
    poll: PollConfig,
}

impl FirecrawlTool {
    pub fn new(kind: ToolKind, api: Arc<dyn FirecrawlApi>, poll: PollConfig) -> Self {
        Self {
            kind,
            name: format!("firecrawl_{kind}"),
            description: None,
            api,
            poll,
        }
    }

    /// Replace the built-in description. Blank strings are ignored.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = Some(description);
        }
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn run(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        match self.kind {
            ToolKind::Scrape => self.one_shot(Endpoint::Scrape, input).await,
            ToolKind::Map => self.one_shot(Endpoint::Map, input).await,
            ToolKind::Search => self.one_shot(Endpoint::Search, input).await,
            ToolKind::Crawl => self.await_job(JobOperation::Crawl, input, ctx).await,
            ToolKind::Agent => self.await_job(JobOperation::Agent, input, ctx).await,
        }
    }

    async fn one_shot(&self, endpoint: Endpoint, input: Value) -> Result<Value, ToolError> {
        self.api
            .call(&endpoint, Some(&input))
            .await
            .map_err(|e| api_error_to_tool(self.kind, e))
    }

    async fn await_job(
        &self,
        operation: JobOperation,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let request = JobRequest::new(operation, input)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;
        let result = StatusPoller::new(self.api.as_ref(), self.poll.clone())
            .with_cancellation(ctx.cancel.clone())
            .submit_and_await(&request)
            .await
            .map_err(|e| match e {
                Error::Submission(SubmissionError::Rejected { source, .. })
                | Error::Api(source) => api_error_to_tool(self.kind, source),
                Error::Validation(e) => ToolError::InvalidParameters(e.to_string()),
                Error::Config(e) => ToolError::ExecutionFailed(e.to_string()),
            })?;
        Ok(reduce(&result).json)
    }
}

fn strip_host_metadata(params: Value) -> Result<Value, ToolError> {
    let Value::Object(mut input) = params else {
        return Err(ToolError::InvalidParameters(
            "parameters must be a JSON object".to_string(),
        ));
    };
    for key in HOST_METADATA_KEYS {
        input.remove(key);
    }
    Ok(Value::Object(input))
}

fn api_error_to_tool(kind: ToolKind, error: ApiError) -> ToolError {
    match error {
        ApiError::Status {
            status: 401 | 403, ..
        } => ToolError::NotAuthorized(format!("Firecrawl API error for {kind}: {error}")),
        ApiError::RateLimited { retry_after, .. } => ToolError::RateLimited(retry_after),
        other => ToolError::ExternalService(format!("Firecrawl API error for {kind}: {other}")),
    }
}

#[async_trait]
impl Tool for FirecrawlTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or_else(|| self.kind.default_description())
    }

    fn parameters_schema(&self) -> Value {
        self.kind.parameters_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let input = strip_host_metadata(params)?;
        require_str(&input, self.kind.required_param())?;

        tracing::debug!(tool = %self.name, "Executing Firecrawl tool");
        let result = self.run(input, ctx).await;
        if let Err(e) = &result {
            tracing::warn!(tool = %self.name, error = %e, "Firecrawl tool failed");
        }
        Ok(ToolOutput::success(result?, start.elapsed()))
    }

    fn execution_timeout(&self) -> Duration {
        match self.kind {
            ToolKind::Crawl | ToolKind::Agent => self.poll.max_wait + POLL_TIMEOUT_SLACK,
            _ => Duration::from_secs(60),
        }
    }
}

/// Build one tool per [`ToolKind`], sharing a single API handle.
pub fn firecrawl_tools(api: Arc<dyn FirecrawlApi>, poll: &PollConfig) -> Vec<Arc<dyn Tool>> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| {
            Arc::new(FirecrawlTool::new(kind, Arc::clone(&api), poll.clone())) as Arc<dyn Tool>
        })
        .collect()
}
