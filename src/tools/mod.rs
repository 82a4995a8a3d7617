//! Lookup tools the model can call.
//!
//! Every tool takes a single free-text `query` and returns plain text capped
//! by the shared [`ToolLimits`]. Failures are reported as [`ToolError`] and
//! handed back to the model as data; they never abort a turn.

mod arxiv;
mod wikipedia;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::ToolLimits;
use crate::conversation::ToolCall;
use crate::llm::ToolSchema;

pub use arxiv::ArxivSearch;
pub use wikipedia::WikipediaSearch;

const USER_AGENT: &str = concat!("scholar-chat/", env!("CARGO_PKG_VERSION"));

/// Recoverable tool failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("{tool} is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("{tool} found no results for '{query}'")]
    EmptyResult { tool: String, query: String },

    #[error("{tool} did not answer within {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl ToolError {
    pub(crate) fn unavailable(tool: &str, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            tool: tool.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn empty(tool: &str, query: &str) -> Self {
        Self::EmptyResult {
            tool: tool.to_string(),
            query: query.to_string(),
        }
    }
}

/// A lookup capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable registry name, also used for attribution in the UI.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments the model must send.
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query"
                }
            },
            "required": ["query"]
        })
    }

    /// Run a lookup. The result must already respect the tool's limits.
    async fn run(&self, query: &str) -> Result<String, ToolError>;
}

/// Public description of a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Name → tool map. Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the Wikipedia and arXiv lookups.
    pub fn new(limits: ToolLimits) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        let mut registry = Self::empty();
        registry.register(Arc::new(WikipediaSearch::new(client.clone(), limits)));
        registry.register(Arc::new(ArxivSearch::new(client, limits)));
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool registered under the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Schemas advertised to the model.
    pub fn get_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Resolve and run one model-issued call.
    pub async fn invoke(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self
            .get(&call.tool_name)
            .ok_or_else(|| ToolError::UnknownTool(call.tool_name.clone()))?;

        let query = call
            .query()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: call.tool_name.clone(),
                reason: "missing 'query' string".to_string(),
            })?;

        tool.run(query).await
    }
}

/// Keep at most `max_chars` characters of `text`, dropping the remainder.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Join formatted documents and apply the character budget.
pub(crate) fn render_documents(documents: &[String], limits: ToolLimits) -> String {
    let joined = documents
        .iter()
        .take(limits.top_k)
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, limits.max_chars)
}

/// Basic HTML/XML entity decoding.
pub(crate) fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
