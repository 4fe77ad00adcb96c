// Copilot chat data models
// Feature: AI Copilot orchestration core

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Chat Messages
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageFrom {
    User,
    Assistant,
}

impl std::fmt::Display for MessageFrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageFrom::User => write!(f, "user"),
            MessageFrom::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageFrom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageFrom::User),
            "assistant" => Ok(MessageFrom::Assistant),
            _ => Err(format!("Invalid message author: {}", s)),
        }
    }
}

/// One version of a message's content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageVersion {
    pub id: String,
    pub content: String,
}

/// A message in the copilot transcript.
///
/// A message always holds at least one version. It becomes a branch point
/// once a second version is added.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Opaque message key
    pub key: String,
    /// Message author
    pub from: MessageFrom,
    /// Display label
    pub name: String,
    first: MessageVersion,
    branches: Vec<MessageVersion>,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn with_content(key: String, from: MessageFrom, name: String, content: String) -> Self {
        Self {
            first: MessageVersion {
                id: format!("{}-v0", key),
                content,
            },
            key,
            from,
            name,
            branches: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a user message for a turn
    pub fn user(turn_id: &str, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_content(
            format!("{}-user", turn_id),
            MessageFrom::User,
            name.into(),
            content.into(),
        )
    }

    /// Create the empty assistant placeholder for a turn
    pub fn assistant_placeholder(turn_id: &str, name: impl Into<String>) -> Self {
        Self::with_content(
            format!("{}-assistant", turn_id),
            MessageFrom::Assistant,
            name.into(),
            String::new(),
        )
    }

    /// Create a standalone assistant message with fixed content
    pub fn assistant(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_content(
            format!("msg_{}", Uuid::new_v4().simple()),
            MessageFrom::Assistant,
            name.into(),
            content.into(),
        )
    }

    pub fn first_version(&self) -> &MessageVersion {
        &self.first
    }

    pub fn latest_version(&self) -> &MessageVersion {
        self.branches.last().unwrap_or(&self.first)
    }

    /// All versions in creation order
    pub fn versions(&self) -> impl Iterator<Item = &MessageVersion> {
        std::iter::once(&self.first).chain(self.branches.iter())
    }

    pub fn version_count(&self) -> usize {
        1 + self.branches.len()
    }

    pub fn is_branch_point(&self) -> bool {
        !self.branches.is_empty()
    }

    /// Add an alternative version and return it
    pub fn add_version(&mut self, content: impl Into<String>) -> &MessageVersion {
        let id = format!("{}-v{}", self.key, self.version_count());
        self.branches.push(MessageVersion {
            id,
            content: content.into(),
        });
        self.latest_version()
    }

    fn latest_version_mut(&mut self) -> &mut MessageVersion {
        match self.branches.last_mut() {
            Some(version) => version,
            None => &mut self.first,
        }
    }

    /// Append streamed text onto the latest version
    pub(crate) fn append_content(&mut self, chunk: &str) {
        self.latest_version_mut().content.push_str(chunk);
    }

    /// Overwrite the latest version's content
    pub(crate) fn replace_content(&mut self, content: String) {
        self.latest_version_mut().content = content;
    }
}

impl Serialize for ChatMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let versions: Vec<&MessageVersion> = self.versions().collect();
        let mut state = serializer.serialize_struct("ChatMessage", 5)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("from", &self.from)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("versions", &versions)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.end()
    }
}

// ============================================================================
// Turn State
// ============================================================================

/// Orchestrator status, one value per orchestrator at a time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    #[default]
    Idle,
    Submitted,
    Streaming,
    Completed,
    Error,
}

impl ChatStatus {
    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatStatus::Submitted | ChatStatus::Streaming)
    }
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatStatus::Idle => write!(f, "idle"),
            ChatStatus::Submitted => write!(f, "submitted"),
            ChatStatus::Streaming => write!(f, "streaming"),
            ChatStatus::Completed => write!(f, "completed"),
            ChatStatus::Error => write!(f, "error"),
        }
    }
}

/// Immutable view of the conversation published after every mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub messages: Arc<Vec<ChatMessage>>,
    pub status: ChatStatus,
}

impl ConversationSnapshot {
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

// ============================================================================
// Handler Contract
// ============================================================================

/// Role in the flat history handed to tool handlers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    System,
    User,
    Assistant,
}

/// Flat role/content pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request handed to a tool's submit handler
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub user_message: String,
    /// Prior turns only, never the turn being submitted
    pub conversation_history: Vec<HistoryEntry>,
    pub model: String,
    pub temperature: f32,
    /// Tool-specific control state, opaque to the core
    pub controls_state: serde_json::Value,
    pub web_search_enabled: bool,
    /// Signalled when the user stops the turn
    pub cancel: CancellationToken,
}

/// Per-turn input supplied by the caller of `submit`
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub text: String,
    pub model: String,
    pub temperature: f32,
    pub controls_state: serde_json::Value,
    pub web_search_enabled: bool,
}

impl TurnInput {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            temperature: 0.7,
            controls_state: serde_json::Value::Null,
            web_search_enabled: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_controls_state(mut self, controls_state: serde_json::Value) -> Self {
        self.controls_state = controls_state;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = enabled;
        self
    }
}

// ============================================================================
// Canvas
// ============================================================================

/// Structured artifact extracted from a completed assistant reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasItem {
    pub id: String,
    /// Tool-specific fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl CanvasItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Collapsible Blocks
// ============================================================================

/// Render hint for fenced blocks of one language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollapsibleBlockConfig {
    pub language: String,
    #[serde(default)]
    pub hide_by_default: bool,
    pub collapsed_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed_icon: Option<String>,
    #[serde(default)]
    pub animate: bool,
}

impl CollapsibleBlockConfig {
    /// A block config that hides its blocks until toggled
    pub fn hidden(language: impl Into<String>, collapsed_label: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            hide_by_default: true,
            collapsed_label: collapsed_label.into(),
            collapsed_icon: None,
            animate: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.collapsed_icon = Some(icon.into());
        self
    }

    pub fn animated(mut self) -> Self {
        self.animate = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_and_placeholder_share_turn() {
        let user = ChatMessage::user("turn1", "You", "hello");
        let assistant = ChatMessage::assistant_placeholder("turn1", "Copilot");

        assert_ne!(user.key, assistant.key);
        assert!(user.key.starts_with("turn1"));
        assert!(assistant.key.starts_with("turn1"));
        assert_eq!(user.version_count(), 1);
        assert_eq!(assistant.latest_version().content, "");
    }

    #[test]
    fn test_add_version_makes_branch_point() {
        let mut message = ChatMessage::assistant("Copilot", "first answer");
        assert!(!message.is_branch_point());

        message.add_version("second answer");

        assert!(message.is_branch_point());
        assert_eq!(message.first_version().content, "first answer");
        assert_eq!(message.latest_version().content, "second answer");
        assert_eq!(message.versions().count(), 2);
    }

    #[test]
    fn test_append_targets_latest_version() {
        let mut message = ChatMessage::assistant_placeholder("t", "Copilot");
        message.append_content("Hel");
        message.append_content("lo");
        assert_eq!(message.latest_version().content, "Hello");

        message.replace_content("oops".to_string());
        assert_eq!(message.latest_version().content, "oops");
    }

    #[test]
    fn test_message_serializes_versions_list() {
        let mut message = ChatMessage::user("t", "You", "hi");
        message.add_version("hi again");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["from"], "user");
        assert_eq!(json["versions"].as_array().unwrap().len(), 2);
        assert_eq!(json["versions"][1]["content"], "hi again");
    }

    #[test]
    fn test_status_busy() {
        assert!(ChatStatus::Submitted.is_busy());
        assert!(ChatStatus::Streaming.is_busy());
        assert!(!ChatStatus::Idle.is_busy());
        assert!(!ChatStatus::Completed.is_busy());
        assert!(!ChatStatus::Error.is_busy());
    }

    #[test]
    fn test_canvas_item_flattens_fields() {
        let item = CanvasItem::new("intent-1").with_field("name", serde_json::json!("greeting"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "intent-1");
        assert_eq!(json["name"], "greeting");
    }

    #[test]
    fn test_message_from_parse() {
        assert_eq!("User".parse::<MessageFrom>().unwrap(), MessageFrom::User);
        assert!("tool".parse::<MessageFrom>().is_err());
    }
}
