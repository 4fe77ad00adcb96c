// Streaming Chat Orchestrator for the copilot
// Feature: AI Copilot orchestration core
//
// Drives one conversational turn end to end against the active tool:
// - Appends the user message and an empty assistant placeholder
// - Calls the tool handler and streams its reply into the placeholder
// - Runs the canvas extractor once the reply is complete
// - Supports cooperative cancellation through `stop`
//
// Status machine:
//   idle -> submitted -> streaming -> completed -> (grace period) -> idle
//   submitted | streaming -> error -> (grace period) -> idle
//   any busy state -> stop() -> idle
//
// The transcript and status live behind one lock owned by the orchestrator.
// Observers only ever see immutable snapshots published on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::canvas::CanvasSink;
use super::error::CopilotError;
use super::history::project_history;
use super::stream::Utf8ChunkDecoder;
use super::welcome::{welcome_message, ASSISTANT_NAME};
use crate::models::copilot::{
    ChatMessage, ChatStatus, ConversationSnapshot, SubmitRequest, TurnInput,
};
use crate::models::tool::Tool;

/// How long `completed`/`error` stay visible before returning to `idle`
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(1000);

/// Display name used for user messages
pub const USER_NAME: &str = "You";

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub grace_period: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Result of one `submit` call
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// A turn was already in flight, or the input was blank
    Ignored,
    /// Reply streamed to the end
    Completed { canvas_items: usize },
    /// Handler or stream failed; the error is shown in the transcript
    Failed(CopilotError),
    /// Stopped by the user, or superseded by a tool switch
    Cancelled,
}

struct ConversationState {
    messages: Arc<Vec<ChatMessage>>,
    status: ChatStatus,
    active_tool: Tool,
    /// Incremented for every turn and every reset
    turn: u64,
    cancel: Option<CancellationToken>,
}

impl ConversationState {
    /// Whether a turn may still touch the transcript
    fn is_current(&self, turn: u64, cancel: &CancellationToken) -> bool {
        self.turn == turn && !cancel.is_cancelled()
    }

    fn assistant_mut(&mut self, key: &str) -> Option<&mut ChatMessage> {
        Arc::make_mut(&mut self.messages)
            .iter_mut()
            .rev()
            .find(|m| m.key == key)
    }
}

struct Shared {
    state: RwLock<ConversationState>,
    snapshots: watch::Sender<ConversationSnapshot>,
    canvas_sink: Arc<dyn CanvasSink>,
    config: OrchestratorConfig,
}

impl Shared {
    fn publish(&self, state: &ConversationState) {
        self.snapshots.send_replace(ConversationSnapshot {
            messages: Arc::clone(&state.messages),
            status: state.status,
        });
    }
}

/// Per-conversation turn driver. Cloning yields another handle to the
/// same conversation.
#[derive(Clone)]
pub struct StreamingChatOrchestrator {
    shared: Arc<Shared>,
}

impl StreamingChatOrchestrator {
    /// Create an orchestrator whose transcript starts with the tool's welcome
    pub fn new(tool: Tool, canvas_sink: Arc<dyn CanvasSink>, config: OrchestratorConfig) -> Self {
        let messages = Arc::new(vec![welcome_message(&tool)]);
        let (snapshots, _) = watch::channel(ConversationSnapshot {
            messages: Arc::clone(&messages),
            status: ChatStatus::Idle,
        });

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(ConversationState {
                    messages,
                    status: ChatStatus::Idle,
                    active_tool: tool,
                    turn: 0,
                    cancel: None,
                }),
                snapshots,
                canvas_sink,
                config,
            }),
        }
    }

    /// Subscribe to snapshots published after every mutation
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub async fn status(&self) -> ChatStatus {
        self.shared.state.read().await.status
    }

    pub async fn messages(&self) -> Arc<Vec<ChatMessage>> {
        Arc::clone(&self.shared.state.read().await.messages)
    }

    pub async fn active_tool(&self) -> Tool {
        self.shared.state.read().await.active_tool.clone()
    }

    /// Make `tool` active and reset the transcript to its welcome message.
    ///
    /// A turn still in flight is cancelled first so it cannot write into the
    /// new transcript.
    pub async fn switch_tool(&self, tool: Tool) {
        let mut state = self.shared.state.write().await;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        log::info!("Copilot tool switched: {} -> {}", state.active_tool.id, tool.id);
        state.turn += 1;
        state.messages = Arc::new(vec![welcome_message(&tool)]);
        state.active_tool = tool;
        state.status = ChatStatus::Idle;
        self.shared.publish(&state);
    }

    /// Cancel the in-flight turn, or cut a `completed`/`error` grace period
    /// short. Returns whether there was anything to stop.
    ///
    /// Status is `idle` as soon as this returns. Neither the stopped turn nor
    /// its pending reset makes any further change.
    pub async fn stop(&self) -> bool {
        let mut state = self.shared.state.write().await;
        if state.cancel.is_none() && state.status == ChatStatus::Idle {
            return false;
        }
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        let stopped = state.turn;
        state.turn += 1;
        state.status = ChatStatus::Idle;
        self.shared.publish(&state);
        log::debug!("Copilot turn {} stopped by user", stopped);
        true
    }

    /// Run one turn. A call made while another turn is `submitted` or
    /// `streaming` is a no-op.
    pub async fn submit(&self, input: TurnInput) -> SubmitOutcome {
        if input.text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let cancel = CancellationToken::new();
        let (turn, tool, history, assistant_key) = {
            let mut state = self.shared.state.write().await;
            if state.status.is_busy() {
                log::debug!("Ignoring submit while copilot status is {}", state.status);
                return SubmitOutcome::Ignored;
            }

            let history = project_history(&state.messages);
            let turn_id = format!("turn_{}", Uuid::new_v4().simple());
            let user = ChatMessage::user(&turn_id, USER_NAME, input.text.clone());
            let assistant = ChatMessage::assistant_placeholder(&turn_id, ASSISTANT_NAME);
            let assistant_key = assistant.key.clone();

            let messages = Arc::make_mut(&mut state.messages);
            messages.push(user);
            messages.push(assistant);

            state.turn += 1;
            state.status = ChatStatus::Submitted;
            state.cancel = Some(cancel.clone());
            self.shared.publish(&state);

            (state.turn, state.active_tool.clone(), history, assistant_key)
        };

        log::debug!("Copilot turn {} submitted to tool {}", turn, tool.id);

        let request = SubmitRequest {
            user_message: input.text,
            conversation_history: history,
            model: input.model,
            temperature: input.temperature,
            controls_state: input.controls_state,
            web_search_enabled: input.web_search_enabled,
            cancel: cancel.clone(),
        };

        if cancel.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }

        let handler = Arc::clone(tool.handler());
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SubmitOutcome::Cancelled,
            result = handler.handle_submit(request) => result,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => return self.fail_turn(turn, &cancel, &assistant_key, e).await,
        };

        {
            let mut state = self.shared.state.write().await;
            if !state.is_current(turn, &cancel) {
                return SubmitOutcome::Cancelled;
            }
            state.status = ChatStatus::Streaming;
            self.shared.publish(&state);
        }

        let parser = response
            .parse_canvas_items
            .or_else(|| tool.canvas_parser().cloned());
        let mut stream = response.stream;
        let mut decoder = Utf8ChunkDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SubmitOutcome::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() && !self.append_chunk(turn, &cancel, &assistant_key, &text).await {
                        return SubmitOutcome::Cancelled;
                    }
                }
                Some(Err(e)) => return self.fail_turn(turn, &cancel, &assistant_key, e).await,
                None => break,
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() && !self.append_chunk(turn, &cancel, &assistant_key, &tail).await {
            return SubmitOutcome::Cancelled;
        }

        let final_text = {
            let mut state = self.shared.state.write().await;
            if !state.is_current(turn, &cancel) {
                return SubmitOutcome::Cancelled;
            }
            state.status = ChatStatus::Completed;
            state.cancel = None;
            self.shared.publish(&state);
            state
                .assistant_mut(&assistant_key)
                .map(|m| m.latest_version().content.clone())
                .unwrap_or_default()
        };
        self.schedule_idle(turn);

        // Status is already committed; extraction problems only cost items
        let canvas_items = match parser {
            Some(parse) => match parse(&final_text) {
                Ok(items) => {
                    let count = items.len();
                    for item in items {
                        self.shared.canvas_sink.on_item_generated(item);
                    }
                    count
                }
                Err(e) => {
                    log::error!("Canvas extraction failed for tool {}: {}", tool.id, e);
                    0
                }
            },
            None => 0,
        };

        log::debug!("Copilot turn {} completed ({} canvas items)", turn, canvas_items);
        SubmitOutcome::Completed { canvas_items }
    }

    /// Append a decoded chunk. Returns false once the turn is no longer current.
    async fn append_chunk(&self, turn: u64, cancel: &CancellationToken, key: &str, text: &str) -> bool {
        let mut state = self.shared.state.write().await;
        if !state.is_current(turn, cancel) {
            return false;
        }
        match state.assistant_mut(key) {
            Some(message) => message.append_content(text),
            None => return false,
        }
        self.shared.publish(&state);
        true
    }

    async fn fail_turn(
        &self,
        turn: u64,
        cancel: &CancellationToken,
        key: &str,
        error: CopilotError,
    ) -> SubmitOutcome {
        {
            let mut state = self.shared.state.write().await;
            if !state.is_current(turn, cancel) {
                return SubmitOutcome::Cancelled;
            }
            log::warn!("Copilot turn {} failed: {}", turn, error);
            if let Some(message) = state.assistant_mut(key) {
                message.replace_content(error.to_user_message());
            }
            state.status = ChatStatus::Error;
            state.cancel = None;
            self.shared.publish(&state);
        }
        self.schedule_idle(turn);
        SubmitOutcome::Failed(error)
    }

    /// Return to `idle` after the grace period unless a newer turn started
    fn schedule_idle(&self, turn: u64) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.config.grace_period).await;
            let mut state = shared.state.write().await;
            if state.turn == turn && matches!(state.status, ChatStatus::Completed | ChatStatus::Error) {
                state.status = ChatStatus::Idle;
                shared.publish(&state);
            }
        });
    }
}
