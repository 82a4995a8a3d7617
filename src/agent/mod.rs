//! Agent module - the tool-augmented response loop.
//!
//! Each user turn follows the "tools in a loop" pattern:
//! 1. Append the user's message to the session's conversation
//! 2. Call the model with the full history and the tool schemas
//! 3. If the model requests tool calls, run them and append the results
//! 4. Repeat until the model answers without tools or the round limit is hit

mod agent_loop;
mod prompt;

pub use agent_loop::{Agent, AgentSettings, Finalization, TurnError, TurnOutcome, TurnPhase};
pub use prompt::build_system_prompt;
