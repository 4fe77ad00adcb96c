// AI Copilot Service Module
// Feature: AI Copilot orchestration core
//
// This module provides the copilot core:
// - Hybrid tool detection (keyword pass, remote classifier escalation)
// - Classification prompt building from the tool registry
// - Streaming turn orchestration with cancellation
// - Conversation history projection
// - Collapsible fenced block extraction for rendering
// - Canvas item extraction from completed replies
// - HTTP transports and the built-in tool catalogue

pub mod blocks;
pub mod canvas;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod handler;
pub mod history;
pub mod orchestrator;
pub mod prompt_builder;
pub mod stream;
pub mod tools;
pub mod welcome;

// Re-export main types
pub use blocks::{normalize_block_configs, BlockToggleState, BlockView, ContentBlockExtractor, ContentSegment, FencedBlock};
pub use canvas::{extract_json_canvas_items, json_canvas_parser, CanvasSink, ChannelCanvasSink, CollectingCanvasSink, NoopCanvasSink};
pub use classifier::{ClassificationRequest, HttpToolClassifier, ToolClassifier};
pub use config::CopilotConfig;
pub use detector::{detect_by_keywords, ToolDetector};
pub use error::{CopilotError, CopilotErrorCode, CopilotResult};
pub use handler::{build_http_client, HttpToolHandler, SubmitResponse, ToolHandler};
pub use history::project_history;
pub use orchestrator::{OrchestratorConfig, StreamingChatOrchestrator, SubmitOutcome};
pub use prompt_builder::{build_classification_prompt, ClassificationPromptBuilder};
pub use stream::{stream_from_chunks, TextStream, Utf8ChunkDecoder};
pub use tools::builtin_registry;
pub use welcome::welcome_message;
