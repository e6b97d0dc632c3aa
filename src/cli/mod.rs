//! Command-line interface.
//!
//! Output (JSON) goes to stdout; logs go to stderr.

mod completion;

pub use completion::Completion;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::api::{Endpoint, FirecrawlApi, FirecrawlClient};
use crate::config::{Config, PollConfig, max_wait_from_secs};
use crate::jobs::{JobOperation, JobRequest, StatusPoller, reduce};
use crate::urls::normalize_urls;

#[derive(Parser, Debug)]
#[command(
    name = "firecrawl-flow",
    version,
    about = "Submit Firecrawl jobs and wait for their results",
    long_about = "Submit Firecrawl scrape, crawl, batch, extract and agent jobs and poll them \
                  to completion.\n\nReads FIRECRAWL_API_KEY (and optional FIRECRAWL_* \
                  settings) from the environment or a .env file."
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape a single URL
    Scrape {
        url: String,

        /// Output formats, comma separated (e.g. markdown,links)
        #[arg(long, value_delimiter = ',')]
        formats: Vec<String>,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Discover the URLs of a website
    Map {
        url: String,

        /// Maximum number of links to return
        #[arg(long)]
        limit: Option<u64>,

        /// Filter discovered URLs by this query
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Search the web
    Search {
        query: String,

        #[arg(long)]
        limit: Option<u64>,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Crawl a website and wait for the pages
    Crawl {
        url: String,

        /// Maximum number of pages to crawl
        #[arg(long)]
        limit: Option<u64>,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Scrape many URLs in one job
    BatchScrape {
        /// URLs: newline, comma or space separated, or a JSON array
        urls: String,

        #[arg(long, value_delimiter = ',')]
        formats: Vec<String>,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Run the research agent on a prompt
    Agent {
        prompt: String,

        /// Optional seed URLs, in any accepted list encoding
        #[arg(long)]
        urls: Option<String>,

        /// JSON schema the result should follow
        #[arg(long, value_name = "JSON")]
        schema: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Extract structured data from URLs
    Extract {
        urls: String,

        /// What to extract
        #[arg(long)]
        prompt: String,

        #[arg(long, value_name = "JSON")]
        schema: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Fetch the current status of a job
    Status { kind: JobOperation, id: String },

    /// List the errors of a crawl or batch scrape job
    Errors { kind: JobOperation, id: String },

    /// Cancel a crawl or batch scrape job
    Cancel { kind: JobOperation, id: String },

    /// List crawls that are currently running
    ActiveCrawls,

    /// Show the crawl parameters derived from a natural language prompt
    CrawlPreview {
        url: String,

        #[arg(long)]
        prompt: String,
    },

    /// Show team credit, token or queue usage
    Usage {
        what: UsageKind,

        /// Historical usage per billing period
        #[arg(long)]
        historical: bool,
    },

    /// Normalize a URL list and print it (no network)
    NormalizeUrls { input: String },

    Completion(Completion),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Credits,
    Tokens,
    Queue,
}

/// Polling overrides for job commands.
#[derive(Args, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Print the submission response instead of waiting
    #[arg(long)]
    pub no_wait: bool,

    /// Give up waiting after this many seconds (2-600)
    #[arg(long, value_name = "SECS", value_parser = parse_max_wait)]
    pub max_wait: Option<Duration>,

    /// Delay between status polls
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,

    /// Retries per poll after a transient failure
    #[arg(long)]
    pub max_poll_retries: Option<u32>,
}

impl WaitArgs {
    pub fn apply(&self, base: &PollConfig) -> PollConfig {
        PollConfig {
            poll_interval: self
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(base.poll_interval),
            max_wait: self.max_wait.unwrap_or(base.max_wait),
            max_poll_retries: self.max_poll_retries.unwrap_or(base.max_poll_retries),
        }
    }
}

/// Extra request fields as a JSON object.
#[derive(Args, Debug, Clone, Default)]
pub struct BodyArgs {
    /// Additional request body fields, e.g. '{"onlyMainContent": true}'
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,
}

impl BodyArgs {
    /// Merge `fields` over the `--params` object.
    fn build(&self, fields: Map<String, Value>) -> anyhow::Result<Value> {
        let mut body = match &self.params {
            Some(raw) => match parse_json_arg("params", raw)? {
                Value::Object(map) => map,
                _ => bail!("--params must be a JSON object"),
            },
            None => Map::new(),
        };
        body.extend(fields);
        Ok(Value::Object(body))
    }
}

fn parse_max_wait(raw: &str) -> Result<Duration, String> {
    let secs: u64 = raw.parse().map_err(|e| format!("{e}"))?;
    max_wait_from_secs(secs)
}

fn parse_json_arg(flag: &str, raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("--{flag} is not valid JSON"))
}

fn fields<const N: usize>(pairs: [(&str, Option<Value>); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect()
}

fn non_empty(list: Vec<String>) -> Option<Value> {
    (!list.is_empty()).then(|| json!(list))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Cli {
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<ExitCode> {
        if let Some(code) = self.command.run_offline()? {
            return Ok(code);
        }
        let config = Config::from_env()?;
        let client = FirecrawlClient::new(&config.firecrawl)?;
        self.command.execute(&client, &config.poll, cancel).await
    }
}

impl Command {
    /// Commands that need neither credentials nor network.
    fn run_offline(&self) -> anyhow::Result<Option<ExitCode>> {
        match self {
            Command::NormalizeUrls { input } => {
                print_json(&json!(normalize_urls(&Value::String(input.clone()))))?;
            }
            Command::Completion(completion) => completion.run()?,
            _ => return Ok(None),
        }
        Ok(Some(ExitCode::SUCCESS))
    }

    async fn execute(
        self,
        api: &dyn FirecrawlApi,
        poll: &PollConfig,
        cancel: CancellationToken,
    ) -> anyhow::Result<ExitCode> {
        match self {
            Command::Scrape { url, formats, body } => {
                let payload = body.build(fields([
                    ("url", Some(json!(url))),
                    ("formats", non_empty(formats)),
                ]))?;
                one_shot(api, Endpoint::Scrape, Some(payload)).await
            }
            Command::Map {
                url,
                limit,
                search,
                body,
            } => {
                let payload = body.build(fields([
                    ("url", Some(json!(url))),
                    ("limit", limit.map(Value::from)),
                    ("search", search.map(Value::from)),
                ]))?;
                one_shot(api, Endpoint::Map, Some(payload)).await
            }
            Command::Search { query, limit, body } => {
                let payload = body.build(fields([
                    ("query", Some(json!(query))),
                    ("limit", limit.map(Value::from)),
                ]))?;
                one_shot(api, Endpoint::Search, Some(payload)).await
            }
            Command::Crawl {
                url,
                limit,
                wait,
                body,
            } => {
                let payload = body.build(fields([
                    ("url", Some(json!(url))),
                    ("limit", limit.map(Value::from)),
                ]))?;
                run_job(api, JobOperation::Crawl, payload, &wait, poll, cancel).await
            }
            Command::BatchScrape {
                urls,
                formats,
                wait,
                body,
            } => {
                let payload = body.build(fields([
                    ("urls", Some(json!(urls))),
                    ("formats", non_empty(formats)),
                ]))?;
                run_job(api, JobOperation::BatchScrape, payload, &wait, poll, cancel).await
            }
            Command::Agent {
                prompt,
                urls,
                schema,
                wait,
                body,
            } => {
                let schema = schema.map(|s| parse_json_arg("schema", &s)).transpose()?;
                let payload = body.build(fields([
                    ("prompt", Some(json!(prompt))),
                    ("urls", urls.map(Value::from)),
                    ("schema", schema),
                ]))?;
                run_job(api, JobOperation::Agent, payload, &wait, poll, cancel).await
            }
            Command::Extract {
                urls,
                prompt,
                schema,
                wait,
                body,
            } => {
                let schema = schema.map(|s| parse_json_arg("schema", &s)).transpose()?;
                let payload = body.build(fields([
                    ("urls", Some(json!(urls))),
                    ("prompt", Some(json!(prompt))),
                    ("schema", schema),
                ]))?;
                run_job(api, JobOperation::Extract, payload, &wait, poll, cancel).await
            }
            Command::Status { kind, id } => {
                let Some(endpoint) = kind.status_endpoint(&id) else {
                    bail!("{kind} jobs answer inline and have no status endpoint");
                };
                one_shot(api, endpoint, None).await
            }
            Command::Errors { kind, id } => {
                let Some(endpoint) = kind.errors_endpoint(&id) else {
                    bail!("only crawl and batch-scrape jobs report errors");
                };
                one_shot(api, endpoint, None).await
            }
            Command::Cancel { kind, id } => {
                let Some(endpoint) = kind.cancel_endpoint(&id) else {
                    bail!("only crawl and batch-scrape jobs can be cancelled");
                };
                one_shot(api, endpoint, None).await
            }
            Command::ActiveCrawls => one_shot(api, Endpoint::ActiveCrawls, None).await,
            Command::CrawlPreview { url, prompt } => {
                let payload = json!({ "url": url, "prompt": prompt });
                one_shot(api, Endpoint::CrawlParamsPreview, Some(payload)).await
            }
            Command::Usage { what, historical } => {
                let endpoint = match what {
                    UsageKind::Credits => Endpoint::CreditUsage { historical },
                    UsageKind::Tokens => Endpoint::TokenUsage { historical },
                    UsageKind::Queue if historical => {
                        bail!("queue status has no historical view")
                    }
                    UsageKind::Queue => Endpoint::QueueStatus,
                };
                one_shot(api, endpoint, None).await
            }
            Command::NormalizeUrls { .. } | Command::Completion(_) => {
                Ok(self.run_offline()?.unwrap_or(ExitCode::SUCCESS))
            }
        }
    }
}

async fn one_shot(
    api: &dyn FirecrawlApi,
    endpoint: Endpoint,
    body: Option<Value>,
) -> anyhow::Result<ExitCode> {
    let response = api.call(&endpoint, body.as_ref()).await?;
    print_json(&response)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_job(
    api: &dyn FirecrawlApi,
    operation: JobOperation,
    payload: Value,
    wait: &WaitArgs,
    poll: &PollConfig,
    cancel: CancellationToken,
) -> anyhow::Result<ExitCode> {
    let request = JobRequest::new(operation, payload)?;

    if wait.no_wait {
        let response = api.submit(&request).await?;
        print_json(&response)?;
        return Ok(ExitCode::SUCCESS);
    }

    let result = StatusPoller::new(api, wait.apply(poll))
        .with_cancellation(cancel)
        .submit_and_await(&request)
        .await?;
    print_json(&reduce(&result).json)?;

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
