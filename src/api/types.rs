//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{Finalization, TurnOutcome};
use crate::conversation::{Message, Source, ToolCall};
use crate::tools::ToolInfo;

/// Form posted by the chat page.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Request to submit a message through the JSON API.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    /// The user's question
    pub content: String,
}

/// A message as exposed to clients, with its computed label.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub source: Source,

    /// Display label derived from `source`
    pub label: String,

    pub content: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            source: message.source.clone(),
            label: message.label(),
            content: message.content.clone(),
            tool_calls: message.tool_calls.clone(),
            tool_call_id: message.tool_call_id.clone(),
            created_at: message.created_at,
        }
    }
}

/// Full conversation of the caller's session.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesResponse {
    pub session_id: Uuid,
    pub messages: Vec<MessageView>,
}

/// Result of one finalized turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub finalization: Finalization,

    /// Model calls made during the turn
    pub rounds: usize,

    /// Messages appended by the turn, the user's message first
    pub messages: Vec<MessageView>,
}

impl TurnResponse {
    pub fn new(outcome: TurnOutcome, appended: &[Message]) -> Self {
        Self {
            finalization: outcome.finalization,
            rounds: outcome.rounds,
            messages: appended.iter().map(MessageView::from).collect(),
        }
    }
}

/// A registered lookup tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolView {
    pub name: String,
    pub label: String,
    pub description: String,
}

impl From<ToolInfo> for ToolView {
    fn from(info: ToolInfo) -> Self {
        Self {
            label: Source::Tool(info.name.clone()).label(),
            name: info.name,
            description: info.description,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
