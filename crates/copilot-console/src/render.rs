// Terminal rendering for streamed assistant replies
//
// Collapsible blocks are replaced by their label line. Output is emitted a
// full line at a time so a fence whose info string is still arriving never
// shows up as prose first.

use copilot_lib::{ContentBlockExtractor, ContentSegment};

/// Render extracted segments as plain terminal text
pub fn render_segments(segments: &[ContentSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            ContentSegment::Text { text } => out.push_str(text),
            ContentSegment::Block(block) => match &block.collapsed {
                Some(view) => {
                    let icon = view.icon.as_deref().map(|i| format!(":{}: ", i)).unwrap_or_default();
                    out.push_str(&format!("[{}{}]\n", icon, view.label));
                }
                None => {
                    out.push_str(&format!("```{}\n", block.language));
                    out.push_str(&block.content);
                    if block.closed {
                        if !block.content.is_empty() {
                            out.push('\n');
                        }
                        out.push_str("```\n");
                    }
                }
            },
        }
    }
    out
}

/// Tracks what has been written for the assistant message being streamed
#[derive(Debug, Default)]
pub struct StreamPrinter {
    key: Option<String>,
    printed: String,
    finished: bool,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write for the current state of message `key`.
    ///
    /// While `complete` is false only whole lines are released. Returns
    /// `None` when there is nothing new.
    pub fn delta(
        &mut self,
        key: &str,
        content: &str,
        extractor: &ContentBlockExtractor,
        complete: bool,
    ) -> Option<String> {
        if self.key.as_deref() != Some(key) {
            self.key = Some(key.to_string());
            self.printed.clear();
            self.finished = false;
        }
        if self.finished {
            return None;
        }

        let segments = if complete {
            extractor.extract_completed(content)
        } else {
            extractor.extract(content)
        };
        let rendered = render_segments(&segments);
        let upto = if complete {
            rendered.len()
        } else {
            rendered.rfind('\n').map(|i| i + 1).unwrap_or(0)
        };
        let visible = &rendered[..upto];

        let mut out = if visible.starts_with(self.printed.as_str()) {
            visible[self.printed.len()..].to_string()
        } else {
            // Content was replaced, e.g. by an inline error
            format!("\n{}", visible)
        };

        if complete {
            self.finished = true;
            if !visible.ends_with('\n') {
                out.push('\n');
            }
        }
        self.printed = visible.to_string();

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_lib::{normalize_block_configs, CollapsibleBlockConfig};

    fn hiding_json() -> ContentBlockExtractor {
        ContentBlockExtractor::new(normalize_block_configs(&[], true))
    }

    #[test]
    fn test_render_collapses_hidden_blocks() {
        let text = "Here you go:\n```json\n{\"id\": 1}\n```\nDone.\n";
        let rendered = render_segments(&hiding_json().extract(text));
        assert_eq!(rendered, "Here you go:\n[:sparkles: Generating intent...]\nDone.\n");
    }

    #[test]
    fn test_render_plain_blocks() {
        let extractor = ContentBlockExtractor::new(Vec::<CollapsibleBlockConfig>::new());
        let rendered = render_segments(&extractor.extract("```rust\nfn main() {}\n```\n"));
        assert_eq!(rendered, "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn test_render_plain_block_keeps_close_fence_on_own_line() {
        let extractor = ContentBlockExtractor::new(Vec::<CollapsibleBlockConfig>::new());

        let rendered = render_segments(&extractor.extract("```sh
ls
cd /
```
ok
"));
        assert_eq!(rendered, "```sh
ls
cd /
```
ok
");

        let rendered = render_segments(&extractor.extract("```
```
"));
        assert_eq!(rendered, "```text
```
");
    }

    #[test]
    fn test_printer_closes_fence_at_end_of_reply() {
        let extractor = ContentBlockExtractor::new(Vec::<CollapsibleBlockConfig>::new());
        let mut printer = StreamPrinter::new();

        let mut output = String::new();
        for (step, complete) in [
            ("```rust
fn main() {}
", false),
            ("```rust
fn main() {}
```", false),
            ("```rust
fn main() {}
```", true),
        ] {
            if let Some(delta) = printer.delta("a", step, &extractor, complete) {
                output.push_str(&delta);
            }
        }

        assert_eq!(output, "```rust
fn main() {}
```
");
    }

    #[test]
    fn test_printer_releases_whole_lines() {
        let extractor = hiding_json();
        let mut printer = StreamPrinter::new();

        assert_eq!(printer.delta("a", "Hel", &extractor, false), None);
        assert_eq!(printer.delta("a", "Hello\nwor", &extractor, false).as_deref(), Some("Hello\n"));
        assert_eq!(printer.delta("a", "Hello\nworld", &extractor, true).as_deref(), Some("world\n"));
        assert_eq!(printer.delta("a", "Hello\nworld", &extractor, true), None);
    }

    #[test]
    fn test_printer_never_shows_partial_fence() {
        let extractor = hiding_json();
        let mut printer = StreamPrinter::new();

        let mut output = String::new();
        for step in ["Intro\n``", "Intro\n```js", "Intro\n```json\n{\"a\"", "Intro\n```json\n{\"a\": 1}\n```\n"] {
            if let Some(delta) = printer.delta("a", step, &extractor, false) {
                output.push_str(&delta);
            }
        }

        assert_eq!(output, "Intro\n[:sparkles: Generating intent...]\n");
    }

    #[test]
    fn test_printer_handles_replaced_content() {
        let extractor = hiding_json();
        let mut printer = StreamPrinter::new();

        printer.delta("a", "partial line\n", &extractor, false);
        let out = printer.delta("a", "Sorry, failed", &extractor, true).unwrap();
        assert_eq!(out, "\nSorry, failed\n");
    }

    #[test]
    fn test_printer_resets_per_message() {
        let extractor = hiding_json();
        let mut printer = StreamPrinter::new();

        printer.delta("a", "one\n", &extractor, true);
        assert_eq!(printer.delta("b", "two\n", &extractor, true).as_deref(), Some("two\n"));
    }
}
