//! Model client abstraction.
//!
//! The conversation loop only sees [`ModelClient::generate`]: full history in,
//! one assistant message out. Whether that message carries tool calls is the
//! model's decision.

mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::conversation::Message;

pub use openai::ChatCompletionsClient;

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Failures that end the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("model did not answer within {0:?}")]
    Timeout(Duration),

    #[error("model returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produce the next assistant message for `history`.
    ///
    /// The model is stateless: the whole history is sent on every call.
    async fn generate(&self, history: &[Message], tools: &[ToolSchema]) -> Result<Message, ModelError>;
}
