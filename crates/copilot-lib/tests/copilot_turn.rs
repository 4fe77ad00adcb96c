// End-to-end copilot turns through the public API

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use copilot_lib::models::tool::DetectionSource;
use copilot_lib::{
    builtin_registry, json_canvas_parser, stream_from_chunks, ChatStatus, ClassificationRequest,
    CollectingCanvasSink, ContentBlockExtractor, CopilotError, CopilotResult, OrchestratorConfig,
    StreamingChatOrchestrator, SubmitOutcome, SubmitRequest, SubmitResponse, Tool, ToolClassifier,
    ToolDetector, ToolHandler, ToolRegistry, TurnInput,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Replies with a fixed text and records the history length of each request
struct ScriptedHandler {
    reply: &'static str,
    seen_history: Mutex<Vec<usize>>,
}

impl ScriptedHandler {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen_history: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ToolHandler for ScriptedHandler {
    fn system_prompt(&self, _controls_state: &serde_json::Value) -> String {
        "scripted".to_string()
    }

    async fn handle_submit(&self, request: SubmitRequest) -> CopilotResult<SubmitResponse> {
        self.seen_history
            .lock()
            .unwrap()
            .push(request.conversation_history.len());
        // Split mid-word to exercise chunk concatenation
        let (head, tail) = self.reply.split_at(self.reply.len() / 2);
        Ok(SubmitResponse::new(stream_from_chunks(vec![head, tail])))
    }
}

struct FixedClassifier(&'static str);

#[async_trait]
impl ToolClassifier for FixedClassifier {
    async fn classify(&self, _request: ClassificationRequest) -> CopilotResult<String> {
        Ok(self.0.to_string())
    }
}

fn registry(intents: Arc<ScriptedHandler>, general: Arc<ScriptedHandler>) -> ToolRegistry {
    ToolRegistry::new(vec![
        Tool::new("intents", "Intent Generator", intents)
            .with_keywords(["intent", "pattern", "utterance", "training phrase"])
            .with_hidden_json_blocks(true)
            .with_canvas_parser(json_canvas_parser("intent")),
        Tool::general("General Chat", general),
    ])
    .unwrap()
}

const INTENT_REPLY: &str = "I drafted one intent:\n```json\n{\"id\": \"order_status\", \"name\": \"Order status\"}\n```\nWant more?";

#[tokio::test(start_paused = true)]
async fn test_detect_then_stream_intent_turn() {
    let intents = ScriptedHandler::new(INTENT_REPLY);
    let general = ScriptedHandler::new("Hi there");
    let registry = registry(intents.clone(), general);
    let detector = ToolDetector::new(Arc::new(FixedClassifier("intents")));

    // One keyword of four: below threshold, escalated to the classifier
    let detection = detector
        .detect("Create an intent for order tracking", &registry, "gpt-4o-mini")
        .await;
    assert_eq!(detection.tool_id(), Some("intents"));
    assert_eq!(detection.source, DetectionSource::Remote);
    assert_eq!(detection.confidence, 0.9);

    let tool = detection.tool.unwrap();
    let sink = Arc::new(CollectingCanvasSink::new());
    let orchestrator = StreamingChatOrchestrator::new(tool.clone(), sink.clone(), OrchestratorConfig::default());

    let outcome = orchestrator
        .submit(TurnInput::new("Create an intent for order tracking", "gpt-4o-mini"))
        .await;
    assert!(matches!(outcome, SubmitOutcome::Completed { canvas_items: 1 }));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status, ChatStatus::Completed);
    assert_eq!(snapshot.messages.len(), 3);
    let reply = &snapshot.messages[2].latest_version().content;
    assert_eq!(reply, INTENT_REPLY);

    let items = sink.items();
    assert_eq!(items[0].id, "order_status");
    assert_eq!(items[0].fields["name"], "Order status");

    let blocks = ContentBlockExtractor::for_tool(&tool).blocks(reply);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].id, "json-0");
    assert_eq!(blocks[0].collapsed.as_ref().unwrap().label, "Generating intent...");

    assert_eq!(*intents.seen_history.lock().unwrap(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_switching_to_detected_tool_resets_history() {
    let intents = ScriptedHandler::new(INTENT_REPLY);
    let general = ScriptedHandler::new("Happy to help");
    let registry = registry(intents.clone(), general.clone());
    let detector = ToolDetector::keyword_only();

    let orchestrator = StreamingChatOrchestrator::new(
        registry.fallback().unwrap().clone(),
        Arc::new(CollectingCanvasSink::new()),
        OrchestratorConfig::default(),
    );
    orchestrator.submit(TurnInput::new("hello", "m")).await;
    orchestrator.submit(TurnInput::new("how are you", "m")).await;
    assert_eq!(*general.seen_history.lock().unwrap(), vec![1, 3]);

    // Two of four keywords: keyword-only detection still answers
    let detection = detector
        .detect("Suggest a pattern and an utterance", &registry, "m")
        .await;
    assert_eq!(detection.source, DetectionSource::Keyword);
    assert_eq!(detection.confidence, 0.5);
    assert_eq!(detection.tool_id(), Some("intents"));

    orchestrator.switch_tool(detection.tool.unwrap()).await;
    orchestrator.submit(TurnInput::new("Suggest a pattern and an utterance", "m")).await;

    // Only the fresh welcome message precedes the first turn of the new tool
    assert_eq!(*intents.seen_history.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_builtin_registry_over_http() {
    if std::env::var("CODEX_SANDBOX_NETWORK_DISABLED").is_ok() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Meet Ava:\n```json\n{\"id\": \"ava\", \"persona\": \"Friendly banker\"}\n```\n",
        ))
        .mount(&server)
        .await;

    let registry = builtin_registry(&format!("{}/chat", server.uri()), reqwest::Client::new()).unwrap();
    let agents = registry.require("agents").unwrap().clone();
    let sink = Arc::new(CollectingCanvasSink::new());
    let orchestrator = StreamingChatOrchestrator::new(agents, sink.clone(), OrchestratorConfig::default());

    let outcome = orchestrator
        .submit(TurnInput::new("Build a support persona", "gpt-4o-mini"))
        .await;

    assert!(matches!(outcome, SubmitOutcome::Completed { canvas_items: 1 }));
    assert_eq!(sink.items()[0].fields["kind"], "agent");
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_inline() {
    let registry = builtin_registry("http://127.0.0.1:9/chat", reqwest::Client::new()).unwrap();
    let general = registry.fallback().unwrap().clone();
    let orchestrator = StreamingChatOrchestrator::new(
        general,
        Arc::new(CollectingCanvasSink::new()),
        OrchestratorConfig::default(),
    );

    let outcome = orchestrator.submit(TurnInput::new("hello", "m")).await;

    match outcome {
        SubmitOutcome::Failed(error) => assert!(!matches!(error, CopilotError::ToolNotFound(_))),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(orchestrator.status().await, ChatStatus::Error);
    assert!(orchestrator
        .snapshot()
        .last_message()
        .unwrap()
        .latest_version()
        .content
        .starts_with("Sorry"));
}
