//! Firecrawl endpoint route table.

use std::fmt;

use reqwest::Method;

/// One Firecrawl REST endpoint, with any path parameter it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Scrape,
    Map,
    Search,
    Crawl,
    CrawlStatus(String),
    CrawlErrors(String),
    CancelCrawl(String),
    ActiveCrawls,
    CrawlParamsPreview,
    Extract,
    ExtractStatus(String),
    BatchScrape,
    BatchScrapeStatus(String),
    BatchScrapeErrors(String),
    CancelBatchScrape(String),
    Agent,
    AgentStatus(String),
    CreditUsage { historical: bool },
    TokenUsage { historical: bool },
    QueueStatus,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Scrape
            | Endpoint::Map
            | Endpoint::Search
            | Endpoint::Crawl
            | Endpoint::CrawlParamsPreview
            | Endpoint::Extract
            | Endpoint::BatchScrape
            | Endpoint::Agent => Method::POST,
            Endpoint::CancelCrawl(_) | Endpoint::CancelBatchScrape(_) => Method::DELETE,
            Endpoint::CrawlStatus(_)
            | Endpoint::CrawlErrors(_)
            | Endpoint::ActiveCrawls
            | Endpoint::ExtractStatus(_)
            | Endpoint::BatchScrapeStatus(_)
            | Endpoint::BatchScrapeErrors(_)
            | Endpoint::AgentStatus(_)
            | Endpoint::CreditUsage { .. }
            | Endpoint::TokenUsage { .. }
            | Endpoint::QueueStatus => Method::GET,
        }
    }

    /// Path relative to the API base URL. Job ids are percent-encoded.
    pub fn path(&self) -> String {
        let enc = |id: &str| urlencoding::encode(id).into_owned();
        match self {
            Endpoint::Scrape => "/scrape".to_string(),
            Endpoint::Map => "/map".to_string(),
            Endpoint::Search => "/search".to_string(),
            Endpoint::Crawl => "/crawl".to_string(),
            Endpoint::CrawlStatus(id) | Endpoint::CancelCrawl(id) => format!("/crawl/{}", enc(id)),
            Endpoint::CrawlErrors(id) => format!("/crawl/{}/errors", enc(id)),
            Endpoint::ActiveCrawls => "/crawl/active".to_string(),
            Endpoint::CrawlParamsPreview => "/crawl/params-preview".to_string(),
            Endpoint::Extract => "/extract".to_string(),
            Endpoint::ExtractStatus(id) => format!("/extract/{}", enc(id)),
            Endpoint::BatchScrape => "/batch/scrape".to_string(),
            Endpoint::BatchScrapeStatus(id) | Endpoint::CancelBatchScrape(id) => {
                format!("/batch/scrape/{}", enc(id))
            }
            Endpoint::BatchScrapeErrors(id) => format!("/batch/scrape/{}/errors", enc(id)),
            Endpoint::Agent => "/agent".to_string(),
            Endpoint::AgentStatus(id) => format!("/agent/{}", enc(id)),
            Endpoint::CreditUsage { historical } => historical_path("/team/credit-usage", *historical),
            Endpoint::TokenUsage { historical } => historical_path("/team/token-usage", *historical),
            Endpoint::QueueStatus => "/team/queue-status".to_string(),
        }
    }

    /// Whether this endpoint sends a JSON body.
    pub fn has_body(&self) -> bool {
        self.method() == Method::POST
    }
}

fn historical_path(base: &str, historical: bool) -> String {
    if historical {
        format!("{base}/historical")
    } else {
        base.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}
