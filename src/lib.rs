//! Firecrawl job runner.
//!
//! Submits scrape, crawl, batch scrape, extract and agent jobs to the
//! Firecrawl API and waits for them with a bounded, retrying status poller.
//! Every job ends in a structured [`jobs::TerminalResult`]; only invalid
//! input and rejected submissions are errors.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod tools;
pub mod urls;
pub mod util;

pub use error::{Error, Result};
