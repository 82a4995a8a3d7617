//! System prompt for the research assistant.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool descriptions.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful research assistant in a chat window.

## Tools

You can look things up with these tools:
{tool_descriptions}

## Guidelines

1. Answer directly when you already know the answer with confidence.
2. Use a tool when the question needs facts you are unsure of, or names a specific paper or article.
3. Tool results are short excerpts. Base your answer on them and say so when they are not enough.
4. If a tool returns an error, try a different query or answer from what you know, and tell the user.
5. Keep answers concise."#,
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolLimits;

    #[test]
    fn prompt_lists_registered_tools() {
        let prompt = build_system_prompt(&ToolRegistry::new(ToolLimits::default()));
        assert!(prompt.contains("- **wikipedia**:"));
        assert!(prompt.contains("- **arxiv**:"));
    }

    #[test]
    fn prompt_without_tools_still_renders() {
        let prompt = build_system_prompt(&ToolRegistry::empty());
        assert!(prompt.starts_with("You are a helpful research assistant"));
    }
}
