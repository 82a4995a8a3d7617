//! OpenAI-compatible Chat Completions client (Groq by default).

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{ModelClient, ModelError, ToolSchema};
use crate::conversation::{Message, Source, ToolCall};

/// Longest slice of an error body carried into `ModelError`.
const ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSchema,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

fn function_type() -> String {
    "function".to_string()
}

/// Client for any `/chat/completions` endpoint that speaks the OpenAI tool-calling format.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: None,
        }
    }

    /// Prepend a system message to every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, history: &[Message], tools: &'a [ToolSchema]) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(prompt.clone()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            });
        }
        messages.extend(history.iter().map(to_wire));

        ChatRequest {
            model: &self.model,
            messages,
            tools: tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        }
    }
}

fn to_wire(message: &Message) -> WireMessage {
    match &message.source {
        Source::User => WireMessage {
            role: "user".to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        },
        Source::Assistant => {
            let tool_calls = (!message.tool_calls.is_empty()).then(|| {
                message
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.call_id.clone(),
                        kind: function_type(),
                        function: WireFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: Value::Object(call.arguments.clone()).to_string(),
                        },
                    })
                    .collect()
            });
            let content = if message.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(message.content.clone())
            };
            WireMessage {
                role: "assistant".to_string(),
                content,
                tool_calls,
                tool_call_id: None,
                name: None,
            }
        }
        Source::Tool(name) => WireMessage {
            role: "tool".to_string(),
            content: Some(message.content.clone()),
            tool_calls: None,
            tool_call_id: message.tool_call_id.clone(),
            name: Some(name.clone()),
        },
    }
}

/// Convert the model's reply into an assistant `Message`.
fn from_wire(reply: WireMessage) -> Message {
    let mut seen = HashSet::new();
    let calls = reply
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let call_id = if call.id.is_empty() || !seen.insert(call.id.clone()) {
                format!("call_{}", Uuid::new_v4().simple())
            } else {
                call.id
            };
            let arguments = serde_json::from_str::<Map<String, Value>>(&call.function.arguments)
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        tool = %call.function.name,
                        "Discarding unparseable tool arguments: {}",
                        e
                    );
                    Map::new()
                });
            ToolCall::new(call_id, call.function.name, arguments)
        })
        .collect();

    Message::assistant_with_calls(reply.content.unwrap_or_default(), calls)
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn generate(&self, history: &[Message], tools: &[ToolSchema]) -> Result<Message, ModelError> {
        let request = self.build_request(history, tools);
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = tools.len(),
            "Requesting chat completion"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ModelError::Unavailable(format!(
                "authentication failed (HTTP {})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!(
                "HTTP {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        Ok(from_wire(choice.message))
    }
}
