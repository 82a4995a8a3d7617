//! # Scholar Chat
//!
//! A minimal web chat that answers questions with a tool-calling language model.
//!
//! This library provides:
//! - A server-rendered chat page and a JSON API, one conversation per browser session
//! - A tool-augmented response loop that lets the model consult lookup tools
//! - Wikipedia and arXiv lookup tools with capped, truncated output
//! - An OpenAI-compatible model client (Groq by default)
//!
//! ## Architecture
//!
//! Each user turn follows the "tools in a loop" pattern:
//! 1. Append the user's message to the session's conversation
//! 2. Call the model with the full history and the available tools
//! 3. If the model requests tool calls, run them and append the results
//! 4. Repeat until the model answers without tools or the round limit is reached
//!
//! ## Example
//!
//! ```rust,ignore
//! use scholar_chat::{agent::Agent, config::Config, conversation::ConversationState};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(&config);
//! let mut state = ConversationState::new();
//! let outcome = agent.run_turn(&mut state, "Summarize arXiv paper 1706.03762").await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod tools;

pub use config::Config;
