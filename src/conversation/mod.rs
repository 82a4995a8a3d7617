//! Conversation data model: messages, sources, tool calls and the per-session log.

mod message;
mod state;

pub use message::{Message, Source, ToolCall};
pub use state::{ConversationState, IntegrityError};
