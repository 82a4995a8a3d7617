//! Shared fakes for integration tests: a scripted model and canned lookup tools.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use scholar_chat::agent::{Agent, AgentSettings};
use scholar_chat::conversation::{Message, ToolCall};
use scholar_chat::llm::{ModelClient, ModelError, ToolSchema};
use scholar_chat::tools::{Tool, ToolError, ToolRegistry};

pub fn call(id: &str, tool: &str, query: &str) -> ToolCall {
    ToolCall::new(
        id,
        tool,
        json!({ "query": query }).as_object().cloned().unwrap_or_default(),
    )
}

/// Model that replays a fixed list of replies and records what it was sent.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Message, ModelError>>>,
    seen_history: Mutex<Vec<Vec<Message>>>,
    seen_tools: Mutex<Vec<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<Message, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn answering(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(Message::assistant(*t))).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen_history.lock().unwrap().len()
    }

    pub fn history_of_call(&self, index: usize) -> Vec<Message> {
        self.seen_history.lock().unwrap()[index].clone()
    }

    pub fn tools_of_call(&self, index: usize) -> Vec<String> {
        self.seen_tools.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, history: &[Message], tools: &[ToolSchema]) -> Result<Message, ModelError> {
        self.seen_history.lock().unwrap().push(history.to_vec());
        self.seen_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Unavailable("script exhausted".to_string())))
    }
}

/// Model that requests another lookup on every call.
#[derive(Default)]
pub struct AlwaysCallsTool {
    calls: AtomicUsize,
}

impl AlwaysCallsTool {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for AlwaysCallsTool {
    async fn generate(&self, _history: &[Message], _tools: &[ToolSchema]) -> Result<Message, ModelError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Message::assistant_with_calls(
            "",
            vec![call(&format!("call_{n}"), "wikipedia", "more")],
        ))
    }
}

/// Lookup tool with a canned behavior.
pub struct FakeTool {
    name: String,
    result: Result<String, ToolError>,
    delay: Option<Duration>,
    runs: AtomicUsize,
}

impl FakeTool {
    pub fn ok(name: &str, output: &str) -> Self {
        Self::with_result(name, Ok(output.to_string()))
    }

    pub fn unavailable(name: &str) -> Self {
        Self::with_result(
            name,
            Err(ToolError::Unavailable {
                tool: name.to_string(),
                reason: "connection refused".to_string(),
            }),
        )
    }

    pub fn with_result(name: &str, result: Result<String, ToolError>) -> Self {
        Self {
            name: name.to_string(),
            result,
            delay: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FakeTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Canned lookup"
    }

    async fn run(&self, _query: &str) -> Result<String, ToolError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

pub fn registry(tools: Vec<Arc<FakeTool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::empty();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

pub fn agent(
    model: Arc<dyn ModelClient>,
    tools: Vec<Arc<FakeTool>>,
    settings: AgentSettings,
) -> Agent {
    Agent::with_parts(model, registry(tools), settings)
}
