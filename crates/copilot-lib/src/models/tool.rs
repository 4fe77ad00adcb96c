// Copilot tool registry models
// Feature: AI Copilot orchestration core
//
// Tools are immutable descriptors supplied at startup. Each tool carries its
// own handler, so dispatch after detection is a plain field access on the
// selected tool rather than a lookup by name.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::models::copilot::{CanvasItem, CollapsibleBlockConfig};
use crate::services::copilot::error::{CopilotError, CopilotResult};
use crate::services::copilot::handler::ToolHandler;

/// Id the fallback tool is expected to carry
pub const GENERAL_TOOL_ID: &str = "general";

/// Extractor run once over a completed assistant reply
pub type CanvasParser = Arc<dyn Fn(&str) -> CopilotResult<Vec<CanvasItem>> + Send + Sync>;

/// Whether a tool is the fallback or a specialized handler
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Catch-all conversation, used when nothing more specific matches
    General,
    /// Handles one category of request
    Specialized,
}

/// Tool descriptor
#[derive(Clone)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Phrase describing when the tool applies
    pub trigger: String,
    /// Lowercased substrings for the keyword pass, in declaration order
    pub keywords: Vec<String>,
    pub kind: ToolKind,
    /// Whether replies produce canvas items
    pub canvas_enabled: bool,
    /// Example prompts shown in the welcome message
    pub examples: Vec<String>,
    pub collapsible_blocks: Vec<CollapsibleBlockConfig>,
    /// Legacy flag, expanded into a `json` block config before rendering
    pub hide_json_blocks: bool,
    handler: Arc<dyn ToolHandler>,
    canvas_parser: Option<CanvasParser>,
}

impl Tool {
    /// Create a specialized tool with the given handler
    pub fn new(id: impl Into<String>, name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            trigger: String::new(),
            keywords: Vec::new(),
            kind: ToolKind::Specialized,
            canvas_enabled: false,
            examples: Vec::new(),
            collapsible_blocks: Vec::new(),
            hide_json_blocks: false,
            handler,
            canvas_parser: None,
        }
    }

    /// Create the fallback tool
    pub fn general(name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        let mut tool = Self::new(GENERAL_TOOL_ID, name, handler);
        tool.kind = ToolKind::General;
        tool
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(|k| k.into().to_lowercase()).collect();
        self
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_collapsible_block(mut self, config: CollapsibleBlockConfig) -> Self {
        self.collapsible_blocks.push(config);
        self
    }

    pub fn with_hidden_json_blocks(mut self, hide: bool) -> Self {
        self.hide_json_blocks = hide;
        self
    }

    /// Attach a canvas item extractor; also marks the tool canvas-enabled
    pub fn with_canvas_parser(mut self, parser: CanvasParser) -> Self {
        self.canvas_parser = Some(parser);
        self.canvas_enabled = true;
        self
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    pub fn canvas_parser(&self) -> Option<&CanvasParser> {
        self.canvas_parser.as_ref()
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == ToolKind::General
    }

    /// System prompt for the given tool control state
    pub fn system_prompt(&self, controls_state: &serde_json::Value) -> String {
        self.handler.system_prompt(controls_state)
    }

    /// Keywords that occur in an already lowercased message
    pub fn matched_keywords(&self, lowered_message: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| lowered_message.contains(k.as_str()))
            .count()
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("keywords", &self.keywords)
            .field("canvas_enabled", &self.canvas_enabled)
            .finish_non_exhaustive()
    }
}

/// Ordered, validated set of tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Validate and build a registry. Registry order is kept as given and is
    /// authoritative for keyword-pass precedence.
    pub fn new(tools: Vec<Tool>) -> CopilotResult<Self> {
        if tools.is_empty() {
            return Err(CopilotError::InvalidRegistry(
                "registry must contain at least one tool".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut fallbacks = 0;
        for tool in &tools {
            let id = tool.id.trim();
            if id.is_empty() {
                return Err(CopilotError::InvalidRegistry("tool id cannot be empty".to_string()));
            }
            if id != tool.id || id.to_lowercase() != tool.id {
                return Err(CopilotError::InvalidRegistry(format!(
                    "tool id must be trimmed lowercase: {:?}",
                    tool.id
                )));
            }
            if !seen.insert(tool.id.clone()) {
                return Err(CopilotError::InvalidRegistry(format!(
                    "duplicate tool id: {}",
                    tool.id
                )));
            }
            if tool.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(CopilotError::InvalidRegistry(format!(
                    "tool {} declares an empty keyword",
                    tool.id
                )));
            }
            if tool.is_fallback() {
                fallbacks += 1;
            }
        }

        if fallbacks > 1 {
            return Err(CopilotError::InvalidRegistry(
                "at most one general tool may be registered".to_string(),
            ));
        }

        Ok(Self { tools })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Look up a tool or fail with `ToolNotFound`
    pub fn require(&self, id: &str) -> CopilotResult<&Tool> {
        self.get(id).ok_or_else(|| CopilotError::ToolNotFound(id.to_string()))
    }

    /// The designated fallback tool, if any
    pub fn fallback(&self) -> Option<&Tool> {
        self.tools.iter().find(|t| t.is_fallback())
    }

    /// Every non-fallback tool in registry order
    pub fn specialized(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter().filter(|t| !t.is_fallback())
    }
}

/// How a detection result was reached
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Keyword,
    Remote,
    Fallback,
}

/// Outcome of tool detection
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// `None` only when the registry has no fallback tool
    pub tool: Option<Tool>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub reason: String,
    pub source: DetectionSource,
}

impl DetectionResult {
    pub fn tool_id(&self) -> Option<&str> {
        self.tool.as_ref().map(|t| t.id.as_str())
    }
}
