// Remote tool classification
// Feature: AI Copilot orchestration core
//
// The detector escalates low-confidence messages to a model-backed
// classifier. The classifier only reports a raw tool id; mapping it onto the
// registry is the detector's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{CopilotError, CopilotResult};

/// Classification request sent to the remote endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub message: String,
    pub model: String,
    pub system_prompt: String,
}

/// Classification endpoint response body
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Success {
        #[serde(rename = "toolId")]
        tool_id: String,
    },
    Failure {
        error: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

/// Trait for remote tool classifiers
#[async_trait]
pub trait ToolClassifier: Send + Sync {
    /// Return the raw tool id chosen by the model
    async fn classify(&self, request: ClassificationRequest) -> CopilotResult<String>;
}

/// Classifier backed by an HTTP endpoint
pub struct HttpToolClassifier {
    client: Client,
    endpoint: String,
}

impl HttpToolClassifier {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ToolClassifier for HttpToolClassifier {
    async fn classify(&self, request: ClassificationRequest) -> CopilotResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CopilotError::ClassificationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CopilotError::ClassificationFailed(format!(
                "Classification endpoint error ({}): {}",
                status, body
            )));
        }

        let parsed: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| CopilotError::ClassificationFailed(format!("Malformed response: {}", e)))?;

        match parsed {
            ClassificationResponse::Success { tool_id } => Ok(tool_id.trim().to_lowercase()),
            ClassificationResponse::Failure { error, details } => {
                let details = details.map(|d| d.to_string()).unwrap_or_default();
                Err(CopilotError::ClassificationFailed(format!("{} {}", error, details).trim().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            message: "create intents for greetings".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "pick one".to_string(),
        }
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["systemPrompt"], "pick one");
        assert_eq!(json["message"], "create intents for greetings");
    }

    #[tokio::test]
    async fn test_classify_success_normalizes_id() {
        if std::env::var("CODEX_SANDBOX_NETWORK_DISABLED").is_ok() {
            return;
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect-tool"))
            .and(body_json(serde_json::to_value(request()).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "toolId": "  Intents\n"
            })))
            .mount(&server)
            .await;

        let classifier = HttpToolClassifier::new(Client::new(), format!("{}/detect-tool", server.uri()));
        let tool_id = classifier.classify(request()).await.unwrap();
        assert_eq!(tool_id, "intents");
    }

    #[tokio::test]
    async fn test_classify_error_payload() {
        if std::env::var("CODEX_SANDBOX_NETWORK_DISABLED").is_ok() {
            return;
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect-tool"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Failed to detect tool",
                "details": "quota exceeded"
            })))
            .mount(&server)
            .await;

        let classifier = HttpToolClassifier::new(Client::new(), format!("{}/detect-tool", server.uri()));
        let err = classifier.classify(request()).await.unwrap_err();
        assert!(matches!(err, CopilotError::ClassificationFailed(ref m) if m.contains("quota")));
    }

    #[tokio::test]
    async fn test_classify_non_success_status() {
        if std::env::var("CODEX_SANDBOX_NETWORK_DISABLED").is_ok() {
            return;
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let classifier = HttpToolClassifier::new(Client::new(), format!("{}/detect-tool", server.uri()));
        assert!(classifier.classify(request()).await.is_err());
    }
}
