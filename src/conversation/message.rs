//! Chat message data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Source {
    /// Typed by the person in the browser
    User,
    /// Produced by the model
    Assistant,
    /// Output of the named lookup tool
    Tool(String),
}

impl Source {
    /// Display label for the chat bubble.
    pub fn label(&self) -> String {
        match self {
            Self::User => "You".to_string(),
            Self::Assistant => "Assistant".to_string(),
            Self::Tool(name) => capitalize(name),
        }
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier linking the call to its result message
    pub call_id: String,
    /// Registry name of the tool
    pub tool_name: String,
    /// Arguments decoded from the model's JSON
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// The `query` argument, if the model supplied one as a string.
    pub fn query(&self) -> Option<&str> {
        self.arguments.get("query").and_then(Value::as_str)
    }
}

/// One entry of the conversation log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub source: Source,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool results: the `call_id` this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_source(Source::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_source(Source::Assistant, content.into())
    }

    /// Assistant message carrying tool calls (content may be empty).
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    /// Result of `call`, attributed to the tool that was asked.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.call_id.clone()),
            ..Self::with_source(Source::Tool(call.tool_name.clone()), content.into())
        }
    }

    fn with_source(source: Source, content: String) -> Self {
        Self {
            source,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Display label, derived from the source on every call.
    pub fn label(&self) -> String {
        self.source.label()
    }

    /// An assistant message that still waits for tool results.
    pub fn requests_tools(&self) -> bool {
        self.source == Source::Assistant && !self.tool_calls.is_empty()
    }
}
