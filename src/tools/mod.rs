//! Agent-facing tools.

mod firecrawl;
mod tool;

pub use firecrawl::{FirecrawlTool, ToolKind, firecrawl_tools};
pub use tool::{Tool, ToolContext, ToolError, ToolOutput, ToolSchema, require_str};
