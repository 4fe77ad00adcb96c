// Tool Handler contract for the copilot
// Feature: AI Copilot orchestration core
//
// A tool handler is the single side-effecting operation a tool exposes: it
// takes the submit request and returns a text stream. `HttpToolHandler` is
// the default transport, posting the conversation to a chat endpoint and
// exposing the response body as the stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use super::error::{CopilotError, CopilotResult};
use super::stream::TextStream;
use crate::models::copilot::{HistoryEntry, SubmitRequest};
use crate::models::tool::CanvasParser;

/// What a handler returns for one submission
pub struct SubmitResponse {
    pub stream: TextStream,
    /// Overrides the tool's own canvas extractor for this turn
    pub parse_canvas_items: Option<CanvasParser>,
}

impl SubmitResponse {
    pub fn new(stream: TextStream) -> Self {
        Self {
            stream,
            parse_canvas_items: None,
        }
    }

    pub fn with_canvas_parser(mut self, parser: CanvasParser) -> Self {
        self.parse_canvas_items = Some(parser);
        self
    }
}

/// Trait for tool handlers
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Build the system prompt from tool-specific control state
    fn system_prompt(&self, controls_state: &serde_json::Value) -> String;

    /// Start a turn and hand back its response stream
    async fn handle_submit(&self, request: SubmitRequest) -> CopilotResult<SubmitResponse>;
}

/// Builds a system prompt from control state
pub type PromptFn = Arc<dyn Fn(&serde_json::Value) -> String + Send + Sync>;

/// Handler that streams replies from an HTTP chat endpoint
pub struct HttpToolHandler {
    client: Client,
    endpoint: String,
    prompt: PromptFn,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolChatRequest<'a> {
    messages: Vec<HistoryEntry>,
    model: &'a str,
    temperature: f32,
    controls_state: &'a serde_json::Value,
    web_search_enabled: bool,
    stream: bool,
}

impl HttpToolHandler {
    pub fn new(client: Client, endpoint: impl Into<String>, prompt: PromptFn) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            prompt,
        }
    }

    /// Handler with a fixed system prompt
    pub fn with_static_prompt(client: Client, endpoint: impl Into<String>, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self::new(client, endpoint, Arc::new(move |_: &serde_json::Value| prompt.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_messages(&self, request: &SubmitRequest) -> Vec<HistoryEntry> {
        let mut messages = Vec::with_capacity(request.conversation_history.len() + 2);
        messages.push(HistoryEntry::system(self.system_prompt(&request.controls_state)));
        messages.extend(request.conversation_history.iter().cloned());
        messages.push(HistoryEntry::user(request.user_message.clone()));
        messages
    }
}

/// Shared HTTP client for copilot transports
pub fn build_http_client(timeout: Duration) -> CopilotResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CopilotError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl ToolHandler for HttpToolHandler {
    fn system_prompt(&self, controls_state: &serde_json::Value) -> String {
        (self.prompt)(controls_state)
    }

    async fn handle_submit(&self, request: SubmitRequest) -> CopilotResult<SubmitResponse> {
        let body = ToolChatRequest {
            messages: self.build_messages(&request),
            model: &request.model,
            temperature: request.temperature,
            controls_state: &request.controls_state,
            web_search_enabled: request.web_search_enabled,
            stream: true,
        };

        log::debug!(
            "Posting copilot turn to {} ({} history entries)",
            self.endpoint,
            request.conversation_history.len()
        );

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CopilotError::ApiError(format!(
                "Chat endpoint error ({}): {}",
                status, body
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| CopilotError::StreamFailed(e.to_string())));

        Ok(SubmitResponse::new(Box::pin(stream)))
    }
}
