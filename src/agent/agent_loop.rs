//! Core conversation loop implementation.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::conversation::{ConversationState, Message, Source, ToolCall};
use crate::llm::{ChatCompletionsClient, ModelClient, ModelError, ToolSchema};
use crate::tools::{ToolError, ToolRegistry};

use super::prompt::build_system_prompt;

/// Loop limits and timeouts.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model calls allowed per turn
    pub max_rounds: usize,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    /// Run one round's tool calls concurrently
    pub parallel_tools: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(20),
            parallel_tools: false,
        }
    }
}

impl From<&Config> for AgentSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_rounds: config.max_rounds,
            model_timeout: config.model_timeout,
            tool_timeout: config.tool_timeout,
            parallel_tools: config.parallel_tools,
        }
    }
}

/// States a turn moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingModel,
    ToolsRequested,
    ToolsResolved,
    Finalized,
}

/// How a finished turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finalization {
    /// The model answered without requesting tools
    Answered,
    /// The round limit was reached; a synthesized notice was appended
    DepthLimit,
}

/// Summary of a finalized turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub finalization: Finalization,
    /// Model calls made
    pub rounds: usize,
    /// Messages appended, the user's message included
    pub appended: usize,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyInput,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// The research assistant: a model plus the tools it may call.
pub struct Agent {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
}

impl Agent {
    /// Create the agent with the hosted model and the default lookup tools.
    pub fn new(config: &Config) -> Self {
        let tools = ToolRegistry::new(config.tool_limits);
        let model = ChatCompletionsClient::new(
            config.api_key.clone(),
            config.model_base_url.clone(),
            config.model.clone(),
        )
        .with_system_prompt(build_system_prompt(&tools));

        Self::with_parts(Arc::new(model), Arc::new(tools), AgentSettings::from(config))
    }

    pub fn with_parts(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            tools,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Run one user turn against `state`.
    ///
    /// Empty input is rejected without touching `state`. If the model fails,
    /// everything the turn appended is removed again so the user can resubmit.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TurnError::EmptyInput);
        }

        let mark = state.mark();
        state.push(Message::user(input));

        match self.drive(state).await {
            Ok((finalization, rounds)) => {
                let outcome = TurnOutcome {
                    finalization,
                    rounds,
                    appended: state.len() - mark,
                };
                tracing::info!(
                    finalization = ?outcome.finalization,
                    rounds = outcome.rounds,
                    appended = outcome.appended,
                    "Turn finalized"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Turn aborted, rolling back {} messages: {}", state.len() - mark, e);
                state.rollback(mark);
                Err(e.into())
            }
        }
    }

    async fn drive(&self, state: &mut ConversationState) -> Result<(Finalization, usize), ModelError> {
        let schemas = self.tools.get_tool_schemas();
        let mut phase = TurnPhase::AwaitingModel;

        for round in 1..=self.settings.max_rounds {
            transition(&mut phase, TurnPhase::AwaitingModel, round);
            let mut reply = self.call_model(state.messages(), &schemas).await?;
            reply.source = Source::Assistant;

            if reply.tool_calls.is_empty() {
                state.push(reply);
                transition(&mut phase, TurnPhase::Finalized, round);
                return Ok((Finalization::Answered, round));
            }

            transition(&mut phase, TurnPhase::ToolsRequested, round);
            let calls = reply.tool_calls.clone();
            state.push(reply);

            let results = self.resolve_tools(&calls).await;
            for (call, content) in calls.iter().zip(results) {
                state.push(Message::tool_result(call, content));
            }
            transition(&mut phase, TurnPhase::ToolsResolved, round);
        }

        tracing::warn!(
            max_rounds = self.settings.max_rounds,
            "Round limit reached without a final answer"
        );
        state.push(Message::assistant(format!(
            "I stopped after {} rounds of tool lookups without reaching a final answer. Please rephrase or narrow the question.",
            self.settings.max_rounds
        )));
        transition(&mut phase, TurnPhase::Finalized, self.settings.max_rounds);
        Ok((Finalization::DepthLimit, self.settings.max_rounds))
    }

    async fn call_model(&self, history: &[Message], schemas: &[ToolSchema]) -> Result<Message, ModelError> {
        let timeout = self.settings.model_timeout;
        match tokio::time::timeout(timeout, self.model.generate(history, schemas)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout)),
        }
    }

    /// Run a round's tool calls. Results come back in the order the calls were issued.
    async fn resolve_tools(&self, calls: &[ToolCall]) -> Vec<String> {
        if self.settings.parallel_tools {
            return join_all(calls.iter().map(|call| self.invoke_tool(call))).await;
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.invoke_tool(call).await);
        }
        results
    }

    /// Run a single call; failures become the result text so the model can react.
    async fn invoke_tool(&self, call: &ToolCall) -> String {
        tracing::info!(
            tool = %call.tool_name,
            call_id = %call.call_id,
            "Calling tool with args: {}",
            serde_json::Value::Object(call.arguments.clone())
        );

        let timeout = self.settings.tool_timeout;
        let result = match tokio::time::timeout(timeout, self.tools.invoke(call)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool: call.tool_name.clone(),
                after: timeout,
            }),
        };

        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %call.tool_name, call_id = %call.call_id, "Tool failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

fn transition(phase: &mut TurnPhase, next: TurnPhase, round: usize) {
    if *phase != next {
        tracing::debug!(round, from = ?*phase, to = ?next, "Turn phase");
        *phase = next;
    }
}
