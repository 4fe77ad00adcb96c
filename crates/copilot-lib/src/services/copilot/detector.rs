// Hybrid Tool Detector for the copilot
// Feature: AI Copilot orchestration core
//
// Maps a free-text message onto a registered tool:
// 1. Keyword pass: first tool in registry order with any keyword hit wins,
//    confidence = hits / keyword count.
// 2. Confident keyword results (>= threshold) return without a remote call.
// 3. Otherwise one remote classification is attempted. Detection never
//    fails: remote errors degrade to the keyword result.

use std::sync::Arc;

use super::classifier::{ClassificationRequest, ToolClassifier};
use super::prompt_builder::build_classification_prompt;
use crate::models::tool::{DetectionResult, DetectionSource, ToolRegistry};

/// Keyword confidence at or above which the remote pass is skipped
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Confidence assigned to a registry-matching remote answer
pub const REMOTE_CONFIDENCE: f64 = 0.9;
/// Confidence assigned when falling back to the general tool
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Fallback result for a registry
fn fallback_result(registry: &ToolRegistry, reason: String) -> DetectionResult {
    DetectionResult {
        tool: registry.fallback().cloned(),
        confidence: FALLBACK_CONFIDENCE,
        reason,
        source: DetectionSource::Fallback,
    }
}

/// Pure keyword pass
pub fn detect_by_keywords(message: &str, registry: &ToolRegistry) -> DetectionResult {
    let lowered = message.to_lowercase();

    for tool in registry.iter() {
        if tool.keywords.is_empty() {
            continue;
        }

        let matched = tool.matched_keywords(&lowered);
        if matched > 0 {
            let confidence = matched as f64 / tool.keywords.len() as f64;
            return DetectionResult {
                tool: Some(tool.clone()),
                confidence,
                reason: format!(
                    "Matched {} of {} keywords for {}",
                    matched,
                    tool.keywords.len(),
                    tool.name
                ),
                source: DetectionSource::Keyword,
            };
        }
    }

    fallback_result(registry, "No keyword match".to_string())
}

/// Hybrid keyword + model tool detector
#[derive(Clone)]
pub struct ToolDetector {
    classifier: Option<Arc<dyn ToolClassifier>>,
    threshold: f64,
}

impl ToolDetector {
    /// Detector that escalates to the given classifier
    pub fn new(classifier: Arc<dyn ToolClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    /// Detector without a remote pass
    pub fn keyword_only() -> Self {
        Self {
            classifier: None,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Detect the tool for a message. Never fails.
    pub async fn detect(&self, message: &str, registry: &ToolRegistry, model: &str) -> DetectionResult {
        let keyword_result = detect_by_keywords(message, registry);

        if keyword_result.confidence >= self.threshold {
            log::debug!(
                "Tool detection fast path: {:?} ({:.2})",
                keyword_result.tool_id(),
                keyword_result.confidence
            );
            return keyword_result;
        }

        let Some(classifier) = self.classifier.as_ref() else {
            return keyword_result;
        };

        let request = ClassificationRequest {
            message: message.to_string(),
            model: model.to_string(),
            system_prompt: build_classification_prompt(registry),
        };

        match classifier.classify(request).await {
            Ok(raw_id) => {
                let tool_id = raw_id.trim().to_lowercase();
                match registry.get(&tool_id) {
                    Some(tool) => {
                        let reason = if tool.is_fallback() {
                            "Model classified the message as general conversation".to_string()
                        } else {
                            format!("Model selected specialized tool {}", tool.name)
                        };
                        log::debug!("Tool detection remote pass chose {}", tool.id);
                        DetectionResult {
                            tool: Some(tool.clone()),
                            confidence: REMOTE_CONFIDENCE,
                            reason,
                            source: DetectionSource::Remote,
                        }
                    }
                    None => {
                        log::debug!("Tool detection remote pass returned unknown id {:?}", tool_id);
                        fallback_result(registry, format!("Model answered unknown tool id {:?}", tool_id))
                    }
                }
            }
            Err(e) => {
                log::warn!("Remote tool classification failed, using keyword result: {}", e);
                keyword_result
            }
        }
    }
}

impl Default for ToolDetector {
    fn default() -> Self {
        Self::keyword_only()
    }
}
