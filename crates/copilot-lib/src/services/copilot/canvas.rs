// Canvas item extraction for the copilot
// Feature: AI Copilot orchestration core
//
// Canvas items are structured artifacts pulled out of a completed assistant
// reply. They are handed to a sink, which owns them from then on.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::blocks::ContentBlockExtractor;
use super::error::{CopilotError, CopilotResult};
use crate::models::copilot::CanvasItem;
use crate::models::tool::CanvasParser;

const JSON_LANGUAGE: &str = "json";

/// Receiver of generated canvas items
pub trait CanvasSink: Send + Sync {
    fn on_item_generated(&self, item: CanvasItem);
}

/// Sink that forwards items over an unbounded channel
pub struct ChannelCanvasSink {
    sender: mpsc::UnboundedSender<CanvasItem>,
}

impl ChannelCanvasSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CanvasItem>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl CanvasSink for ChannelCanvasSink {
    fn on_item_generated(&self, item: CanvasItem) {
        if self.sender.send(item).is_err() {
            log::warn!("Canvas receiver dropped, discarding generated item");
        }
    }
}

/// Sink that keeps every item in memory
#[derive(Default)]
pub struct CollectingCanvasSink {
    items: Mutex<Vec<CanvasItem>>,
}

impl CollectingCanvasSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items received so far, in emission order
    pub fn items(&self) -> Vec<CanvasItem> {
        match self.items.lock() {
            Ok(items) => items.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CanvasSink for CollectingCanvasSink {
    fn on_item_generated(&self, item: CanvasItem) {
        match self.items.lock() {
            Ok(mut items) => items.push(item),
            Err(poisoned) => poisoned.into_inner().push(item),
        }
    }
}

/// Sink that drops everything
pub struct NoopCanvasSink;

impl CanvasSink for NoopCanvasSink {
    fn on_item_generated(&self, _item: CanvasItem) {}
}

fn object_to_item(
    object: serde_json::Map<String, serde_json::Value>,
    kind: &str,
) -> CanvasItem {
    let mut fields = object;
    let id = match fields.remove("id") {
        Some(serde_json::Value::String(id)) if !id.trim().is_empty() => id,
        _ => format!("{}-{}", kind, Uuid::new_v4().simple()),
    };
    fields
        .entry("kind".to_string())
        .or_insert_with(|| serde_json::Value::String(kind.to_string()));
    CanvasItem { id, fields }
}

/// Extract canvas items from every closed json block of a completed reply.
///
/// Blocks are found with the same fence rules the transcript uses, so any
/// fence the user sees as json is parsed. Each block may hold one object or
/// an array of objects. Objects keep their string `id` or get a fresh one;
/// anything that is not an object is skipped.
pub fn extract_json_canvas_items(text: &str, kind: &str) -> CopilotResult<Vec<CanvasItem>> {
    let mut items = Vec::new();
    let blocks = ContentBlockExtractor::default().blocks(text);

    for block in blocks.iter().filter(|b| b.closed && b.language == JSON_LANGUAGE) {
        let index = block.occurrence;
        let value: serde_json::Value = serde_json::from_str(&block.content).map_err(|e| {
            CopilotError::CanvasParseFailed(format!("json block {}: {}", index, e))
        })?;

        match value {
            serde_json::Value::Object(object) => items.push(object_to_item(object, kind)),
            serde_json::Value::Array(values) => {
                for value in values {
                    if let serde_json::Value::Object(object) = value {
                        items.push(object_to_item(object, kind));
                    }
                }
            }
            _ => log::debug!("Skipping non-object json block {} for {}", index, kind),
        }
    }

    Ok(items)
}

/// Canvas parser producing items of the given kind from json blocks
pub fn json_canvas_parser(kind: impl Into<String>) -> CanvasParser {
    let kind = kind.into();
    Arc::new(move |text: &str| extract_json_canvas_items(text, &kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_object_and_array_blocks() {
        let text = "Intent:\n```json\n{\"id\": \"greet\", \"name\": \"Greeting\"}\n```\n\
                    More:\n```json\n[{\"name\": \"Farewell\"}, 3, {\"name\": \"Thanks\"}]\n```\n";

        let items = extract_json_canvas_items(text, "intent").unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "greet");
        assert_eq!(items[0].fields["name"], "Greeting");
        assert_eq!(items[0].fields["kind"], "intent");
        assert!(items[1].id.starts_with("intent-"));
        assert_eq!(items[2].fields["name"], "Thanks");
    }

    #[test]
    fn test_extract_ignores_other_languages() {
        let text = "```ts\nconst a = {}\n```\n";
        assert!(extract_json_canvas_items(text, "intent").unwrap().is_empty());
    }

    #[test]
    fn test_extract_follows_transcript_fence_rules() {
        let text = "```JSON\n{\"id\": \"upper\"}\n```\n\
                    ~~~json\n{\"id\": \"tilde\"}\n~~~\n\
                    ```jsonc\n{\"id\": \"commented\"}\n```\n\
                    ```json\n{\"id\": \"last\"}\n```";

        let ids: Vec<String> = extract_json_canvas_items(text, "intent")
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(ids, vec!["upper", "tilde", "last"]);
    }

    #[test]
    fn test_extract_skips_unclosed_block() {
        let text = "```json\n{\"id\": \"done\"}\n```\n```json\n{\"id\": \"cut";
        let items = extract_json_canvas_items(text, "intent").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "done");
    }

    #[test]
    fn test_extract_invalid_json_fails() {
        let text = "```json\n{\"name\": \n```\n";
        let result = extract_json_canvas_items(text, "intent");
        assert!(matches!(result, Err(CopilotError::CanvasParseFailed(_))));
    }

    #[test]
    fn test_parser_closure() {
        let parser = json_canvas_parser("agent");
        let items = parser("```json\n{\"name\": \"Support bot\"}\n```\n").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].fields["kind"], "agent");
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut receiver) = ChannelCanvasSink::new();
        sink.on_item_generated(CanvasItem::new("a"));
        sink.on_item_generated(CanvasItem::new("b"));

        assert_eq!(receiver.recv().await.unwrap().id, "a");
        assert_eq!(receiver.recv().await.unwrap().id, "b");
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingCanvasSink::new();
        sink.on_item_generated(CanvasItem::new("x"));
        assert_eq!(sink.items().len(), 1);
    }
}
