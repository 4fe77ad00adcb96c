// Collapsible Content Block Extractor
// Feature: AI Copilot orchestration core
//
// Splits (possibly partial) streamed text into prose and fenced code blocks:
// - ```lang ... ``` and ~~~lang ... ~~~ fences
// - Each block gets a stable `language-occurrence` id (0-based per language)
// - Blocks whose language is configured with hide_by_default start collapsed
//   behind a label until toggled
// - An unterminated trailing fence is reported as an open block so partial
//   output can be rendered while it streams

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::copilot::CollapsibleBlockConfig;
use crate::models::tool::Tool;

/// Label used for JSON blocks hidden through the legacy flag
pub const DEFAULT_JSON_LABEL: &str = "Generating intent...";
/// Icon used for JSON blocks hidden through the legacy flag
pub const DEFAULT_JSON_ICON: &str = "sparkles";
/// Language assigned to fences without an info string
pub const PLAIN_LANGUAGE: &str = "text";

// ============================================================================
// Regex Patterns
// ============================================================================

/// Opening fence: up to three spaces, a run of backticks or tildes, info string
static OPEN_FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").expect("Invalid open fence regex")
});

/// Closing fence: the fence run alone on its line
static CLOSE_FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(`{3,}|~{3,})[ \t]*$").expect("Invalid close fence regex")
});

// ============================================================================
// Config Normalization
// ============================================================================

/// Expand the legacy "hide JSON blocks" flag into a block config.
///
/// An explicit `json` entry always wins over the flag.
pub fn normalize_block_configs(
    configs: &[CollapsibleBlockConfig],
    hide_json_blocks: bool,
) -> Vec<CollapsibleBlockConfig> {
    let mut normalized: Vec<CollapsibleBlockConfig> = configs
        .iter()
        .map(|c| CollapsibleBlockConfig {
            language: c.language.trim().to_lowercase(),
            ..c.clone()
        })
        .collect();

    if hide_json_blocks && !normalized.iter().any(|c| c.language == "json") {
        normalized.push(
            CollapsibleBlockConfig::hidden("json", DEFAULT_JSON_LABEL)
                .with_icon(DEFAULT_JSON_ICON)
                .animated(),
        );
    }

    normalized
}

// ============================================================================
// Segments
// ============================================================================

/// What a collapsed block shows instead of its content
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollapsedView {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub animate: bool,
}

/// A fenced block found in the text
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FencedBlock {
    /// `language-occurrence`, stable while block order and language hold
    pub id: String,
    pub language: String,
    pub occurrence: usize,
    /// Raw source between the fences
    pub content: String,
    /// Whether the closing fence has been seen
    pub closed: bool,
    /// Present when the block starts collapsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<CollapsedView>,
}

impl FencedBlock {
    pub fn is_collapsible(&self) -> bool {
        self.collapsed.is_some()
    }
}

/// Piece of rendered assistant text
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    Text { text: String },
    Block(FencedBlock),
}

// ============================================================================
// Extractor
// ============================================================================

struct OpenFence {
    marker: char,
    width: usize,
    language: String,
    lines: Vec<String>,
}

/// Flag-free extractor over normalized block configs
#[derive(Debug, Clone, Default)]
pub struct ContentBlockExtractor {
    configs: Vec<CollapsibleBlockConfig>,
}

impl ContentBlockExtractor {
    /// Create an extractor from already-normalized configs
    pub fn new(configs: Vec<CollapsibleBlockConfig>) -> Self {
        Self { configs }
    }

    /// Create an extractor for a tool, expanding its legacy JSON flag
    pub fn for_tool(tool: &Tool) -> Self {
        Self::new(normalize_block_configs(&tool.collapsible_blocks, tool.hide_json_blocks))
    }

    pub fn configs(&self) -> &[CollapsibleBlockConfig] {
        &self.configs
    }

    /// First config registered for a language
    pub fn config_for(&self, language: &str) -> Option<&CollapsibleBlockConfig> {
        self.configs.iter().find(|c| c.language == language)
    }

    fn collapsed_view(&self, language: &str) -> Option<CollapsedView> {
        self.config_for(language)
            .filter(|c| c.hide_by_default)
            .map(|c| CollapsedView {
                label: c.collapsed_label.clone(),
                icon: c.collapsed_icon.clone(),
                animate: c.animate,
            })
    }

    fn finish_block(
        &self,
        fence: OpenFence,
        closed: bool,
        occurrences: &mut HashMap<String, usize>,
    ) -> FencedBlock {
        let counter = occurrences.entry(fence.language.clone()).or_insert(0);
        let occurrence = *counter;
        *counter += 1;

        let mut content = fence.lines.concat();
        if content.ends_with('\n') {
            content.pop();
            if content.ends_with('\r') {
                content.pop();
            }
        }

        FencedBlock {
            id: format!("{}-{}", fence.language, occurrence),
            collapsed: self.collapsed_view(&fence.language),
            language: fence.language,
            occurrence,
            content,
            closed,
        }
    }

    /// Split text that may still be streaming into prose and fenced blocks,
    /// in document order. A close fence counts only once its line has ended.
    pub fn extract(&self, text: &str) -> Vec<ContentSegment> {
        self.scan(text, false)
    }

    /// Like `extract`, for a reply that has finished streaming: a close fence
    /// on the unterminated last line closes its block.
    pub fn extract_completed(&self, text: &str) -> Vec<ContentSegment> {
        self.scan(text, true)
    }

    fn scan(&self, text: &str, completed: bool) -> Vec<ContentSegment> {
        let mut segments = Vec::new();
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        let mut prose = String::new();
        let mut open: Option<OpenFence> = None;

        for line in text.split_inclusive('\n') {
            let bare = line.trim_end_matches(['\n', '\r']);

            if let Some(mut fence) = open.take() {
                let closes = CLOSE_FENCE_PATTERN.captures(bare).is_some_and(|caps| {
                    let run = &caps[1];
                    run.starts_with(fence.marker) && run.len() >= fence.width
                });
                // While streaming, a close fence is only final once its line has ended
                if closes && (completed || line.ends_with('\n')) {
                    segments.push(ContentSegment::Block(self.finish_block(
                        fence,
                        true,
                        &mut occurrences,
                    )));
                } else {
                    fence.lines.push(line.to_string());
                    open = Some(fence);
                }
                continue;
            }

            // The info string is only settled once the fence line has ended
            let caps = if line.ends_with('\n') {
                OPEN_FENCE_PATTERN.captures(bare)
            } else {
                None
            };
            if let Some(caps) = caps {
                let run = &caps[1];
                let info = caps[2].trim();
                let marker = run.chars().next().unwrap_or('`');
                // Backtick fences cannot carry backticks in their info string
                if !(marker == '`' && info.contains('`')) {
                    if !prose.is_empty() {
                        segments.push(ContentSegment::Text {
                            text: std::mem::take(&mut prose),
                        });
                    }
                    let language = info
                        .split_whitespace()
                        .next()
                        .map(|l| l.to_lowercase())
                        .unwrap_or_else(|| PLAIN_LANGUAGE.to_string());
                    open = Some(OpenFence {
                        marker,
                        width: run.len(),
                        language,
                        lines: Vec::new(),
                    });
                    continue;
                }
            }

            prose.push_str(line);
        }

        if !prose.is_empty() {
            segments.push(ContentSegment::Text { text: prose });
        }
        if let Some(fence) = open {
            segments.push(ContentSegment::Block(self.finish_block(
                fence,
                false,
                &mut occurrences,
            )));
        }

        segments
    }

    /// Fenced blocks of a completed reply, in document order
    pub fn blocks(&self, text: &str) -> Vec<FencedBlock> {
        self.extract_completed(text)
            .into_iter()
            .filter_map(|segment| match segment {
                ContentSegment::Block(block) => Some(block),
                ContentSegment::Text { .. } => None,
            })
            .collect()
    }
}

// ============================================================================
// Toggle State
// ============================================================================

/// How a block should be drawn right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockView<'a> {
    /// Not collapsible, draw the content
    Plain(&'a str),
    /// Collapsible and currently hidden
    Collapsed(&'a CollapsedView),
    /// Collapsible and revealed by the user
    Revealed { content: &'a str, view: &'a CollapsedView },
}

/// Reveal/hide state for collapsible blocks, keyed by block id
#[derive(Debug, Clone, Default)]
pub struct BlockToggleState {
    revealed: HashSet<String>,
}

impl BlockToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a collapsible block. Returns whether it is now revealed;
    /// non-collapsible blocks are not tracked and always report `false`.
    pub fn toggle(&mut self, block: &FencedBlock) -> bool {
        if !block.is_collapsible() {
            return false;
        }
        if self.revealed.remove(&block.id) {
            false
        } else {
            self.revealed.insert(block.id.clone());
            true
        }
    }

    pub fn is_revealed(&self, block: &FencedBlock) -> bool {
        block.is_collapsible() && self.revealed.contains(&block.id)
    }

    pub fn view<'a>(&self, block: &'a FencedBlock) -> BlockView<'a> {
        match block.collapsed.as_ref() {
            None => BlockView::Plain(&block.content),
            Some(view) if self.revealed.contains(&block.id) => BlockView::Revealed {
                content: &block.content,
                view,
            },
            Some(view) => BlockView::Collapsed(view),
        }
    }

    /// Forget all toggles, e.g. when the transcript is reset
    pub fn clear(&mut self) {
        self.revealed.clear();
    }

    pub fn tracked(&self) -> usize {
        self.revealed.len()
    }
}
