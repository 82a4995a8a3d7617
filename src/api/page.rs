//! Server-rendered chat page.

use std::fmt::Write;

use crate::conversation::{Message, Source};
use crate::tools::ToolInfo;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; color: #333; }
.layout { display: flex; max-width: 1000px; margin: 0 auto; }
aside { width: 240px; padding: 16px; background: #f5f5f5; font-size: 14px; }
main { flex: 1; padding: 16px 24px; }
h3 { text-align: center; }
form.ask { display: flex; gap: 8px; margin-bottom: 16px; }
form.ask input[type=text] { flex: 1; padding: 8px; }
.row { margin: 8px 0; }
.row.user { text-align: right; }
.row.other { text-align: left; }
.bubble { display: inline-block; padding: 10px; border-radius: 10px; max-width: 80%; text-align: left; white-space: pre-wrap; }
.user .bubble { background-color: #DCF8C6; }
.other .bubble { background-color: #E8E8E8; }
.error .bubble { background-color: #F8D7DA; color: #721C24; }
.call { font-style: italic; color: #666; }
footer { border-top: 1px solid #ddd; margin-top: 24px; padding-top: 8px; font-size: 13px; }
"#;

/// Render the whole chat page for one session.
pub fn render_page(messages: &[Message], notice: Option<&str>, tools: &[ToolInfo]) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Scholar Chat</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"layout\">\n");

    render_sidebar(&mut html, tools);

    html.push_str("<main>\n<h3>💬 Tool-Based Research Chat</h3>\n");
    html.push_str("<p>Ask a question below, and get responses from either the assistant or its research tools.</p>\n");
    html.push_str(
        "<form class=\"ask\" method=\"post\" action=\"/chat\">\n\
         <input type=\"text\" name=\"message\" placeholder=\"Ask me anything...\" autocomplete=\"off\" autofocus>\n\
         <button type=\"submit\">➤</button>\n</form>\n",
    );

    html.push_str("<h6>Chat History</h6>\n");
    for message in messages {
        render_message(&mut html, message);
    }
    if let Some(notice) = notice {
        let _ = writeln!(
            html,
            "<div class=\"row other error\"><span class=\"bubble\"><strong>Error:</strong> {}</span></div>",
            escape_html(notice)
        );
    }
    if !messages.is_empty() {
        html.push_str(
            "<form method=\"post\" action=\"/chat/reset\"><button type=\"submit\">Clear chat</button></form>\n",
        );
    }

    html.push_str(
        "<footer><strong>About</strong><br>Answers come from a hosted language model that can consult Wikipedia and arXiv.</footer>\n",
    );
    html.push_str("</main>\n</div>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, tools: &[ToolInfo]) {
    html.push_str("<aside>\n<h4>🤖 Chatbot Information</h4>\n");
    html.push_str("<p>The assistant answers directly or fetches data from research tools. The source of every message is shown next to it.</p>\n<ul>\n");
    for tool in tools {
        let _ = writeln!(
            html,
            "<li><strong>{}</strong>: {}</li>",
            escape_html(&Source::Tool(tool.name.clone()).label()),
            escape_html(&tool.description)
        );
    }
    html.push_str("</ul>\n</aside>\n");
}

fn render_message(html: &mut String, message: &Message) {
    let class = match message.source {
        Source::User => "user",
        Source::Assistant | Source::Tool(_) => "other",
    };

    let mut body = escape_html(&message.content);
    for call in &message.tool_calls {
        if !body.is_empty() {
            body.push('\n');
        }
        let _ = write!(
            body,
            "<span class=\"call\">Looking up {}: {}</span>",
            escape_html(&Source::Tool(call.tool_name.clone()).label()),
            escape_html(call.query().unwrap_or(""))
        );
    }

    let _ = writeln!(
        html,
        "<div class=\"row {}\"><span class=\"bubble\"><strong>{}:</strong> {}</span></div>",
        class,
        escape_html(&message.label()),
        body
    );
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
