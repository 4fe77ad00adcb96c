// Welcome message for a freshly selected tool
// Feature: AI Copilot orchestration core

use crate::models::copilot::ChatMessage;
use crate::models::tool::Tool;

/// Display name used for assistant messages
pub const ASSISTANT_NAME: &str = "Copilot";

/// Markdown body of the welcome message, built from the tool's static metadata
pub fn welcome_text(tool: &Tool) -> String {
    let mut sections = vec![format!("Hi! You're now talking to **{}**.", tool.name)];

    if !tool.description.is_empty() {
        sections.push(tool.description.clone());
    }

    if tool.canvas_enabled {
        sections.push(
            "Anything I generate will also show up on the canvas, where you can review and save it."
                .to_string(),
        );
    }

    if !tool.examples.is_empty() {
        let examples = tool
            .examples
            .iter()
            .map(|e| format!("- {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Try asking:\n{}", examples));
    }

    sections.join("\n\n")
}

/// Synthesized assistant message shown after switching tools
pub fn welcome_message(tool: &Tool) -> ChatMessage {
    ChatMessage::assistant(ASSISTANT_NAME, welcome_text(tool))
}
