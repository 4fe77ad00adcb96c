// Built-in copilot tools
// Feature: AI Copilot orchestration core
//
// The default catalogue: two canvas generators and the general fallback.
// All three stream from the same chat endpoint and differ only in their
// system prompts and rendering hints.

use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;

use super::canvas::json_canvas_parser;
use super::error::CopilotResult;
use super::handler::HttpToolHandler;
use crate::models::copilot::CollapsibleBlockConfig;
use crate::models::tool::{Tool, ToolRegistry};

pub const INTENTS_TOOL_ID: &str = "intents";
pub const AGENTS_TOOL_ID: &str = "agents";

/// Read an optional, non-empty string control
fn control<'a>(controls_state: &'a Value, key: &str) -> Option<&'a str> {
    controls_state
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// ============================================================================
// System prompts
// ============================================================================

fn intents_prompt(controls_state: &Value) -> String {
    let mut prompt = String::from(
        "You are an assistant that designs conversational intents.\n\n\
         For every intent you propose, explain it briefly in prose and then emit it \
         as a ```json block containing an object with `id`, `name`, `description` \
         and `trainingPhrases` (an array of at least five varied user utterances).\n\
         Several intents may be returned as a JSON array in a single block.",
    );

    if let Some(domain) = control(controls_state, "domain") {
        prompt.push_str(&format!("\n\nThe intents belong to this domain: {}.", domain));
    }
    if let Some(language) = control(controls_state, "language") {
        prompt.push_str(&format!("\nWrite training phrases in {}.", language));
    }
    if let Some(count) = controls_state.get("phraseCount").and_then(Value::as_u64) {
        prompt.push_str(&format!("\nProvide exactly {} training phrases per intent.", count));
    }

    prompt
}

fn agents_prompt(controls_state: &Value) -> String {
    let mut prompt = String::from(
        "You are an assistant that designs AI agents.\n\n\
         Describe the agent you propose in a few sentences, then emit it as a \
         ```json block containing an object with `id`, `name`, `persona`, \
         `systemPrompt` and `capabilities` (an array of short strings).",
    );

    if let Some(tone) = control(controls_state, "tone") {
        prompt.push_str(&format!("\n\nThe agent should speak in a {} tone.", tone));
    }
    if let Some(audience) = control(controls_state, "audience") {
        prompt.push_str(&format!("\nIts users are: {}.", audience));
    }

    prompt
}

fn general_prompt(controls_state: &Value) -> String {
    let mut prompt = String::from(
        "You are a helpful copilot. Answer clearly and concisely using Markdown. \
         When the user asks for intents or agents, suggest the dedicated tools.",
    );

    if let Some(language) = control(controls_state, "language") {
        prompt.push_str(&format!("\nReply in {}.", language));
    }

    prompt
}

// ============================================================================
// Catalogue
// ============================================================================

/// Build the default registry. Every tool posts to `chat_endpoint`.
pub fn builtin_registry(chat_endpoint: &str, client: Client) -> CopilotResult<ToolRegistry> {
    let handler = |prompt: fn(&Value) -> String| {
        Arc::new(HttpToolHandler::new(
            client.clone(),
            chat_endpoint,
            Arc::new(prompt),
        ))
    };

    let intents = Tool::new(INTENTS_TOOL_ID, "Intent Generator", handler(intents_prompt))
        .with_description("I design intents and training phrases for your assistant.")
        .with_trigger("The user wants to create or refine intents, utterances or training phrases")
        .with_keywords(["intent", "pattern", "utterance", "training phrase"])
        .with_examples([
            "Create intents for a pizza delivery bot",
            "Add training phrases for checking an order status",
        ])
        .with_hidden_json_blocks(true)
        .with_canvas_parser(json_canvas_parser("intent"));

    let agents = Tool::new(AGENTS_TOOL_ID, "Agent Generator", handler(agents_prompt))
        .with_description("I draft agent personas and their system prompts.")
        .with_trigger("The user wants to create or configure an AI agent or persona")
        .with_keywords(["agent", "persona", "system prompt"])
        .with_examples([
            "Build a friendly support agent for a bank",
            "Write a system prompt for a travel planner persona",
        ])
        .with_collapsible_block(
            CollapsibleBlockConfig::hidden("json", "Generating agent...")
                .with_icon("sparkles")
                .animated(),
        )
        .with_canvas_parser(json_canvas_parser("agent"));

    let general = Tool::general("General Chat", handler(general_prompt))
        .with_description("Ask me anything about building conversational assistants.")
        .with_trigger("Anything that no other tool covers")
        .with_examples(["What makes a good training phrase?"]);

    ToolRegistry::new(vec![intents, agents, general])
}
