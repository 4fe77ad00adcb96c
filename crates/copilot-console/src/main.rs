// Copilot Console
// Line-oriented terminal front end for the copilot core
//
// Each input line is routed through hybrid tool detection and submitted to
// the orchestrator. The reply streams to stdout; Ctrl-C stops the turn in
// flight, or exits when nothing is running.
//
// Commands:
//   /tools        list registered tools
//   /tool <id>    switch tool (resets the conversation)
//   /new          restart the conversation with the current tool
//   /model [id]   pick the model, or go back to the configured one
//   /web on|off   toggle web search
//   /quit         exit

mod render;

use std::sync::Arc;

use copilot_lib::models::copilot::{ChatStatus, MessageFrom, TurnInput};
use copilot_lib::models::tool::{DetectionSource, Tool, ToolRegistry};
use copilot_lib::services::copilot::welcome::welcome_text;
use copilot_lib::utils::PreferencesStore;
use copilot_lib::{
    build_http_client, builtin_registry, normalize_block_configs, ChannelCanvasSink,
    ContentBlockExtractor, CopilotConfig, CopilotResult, HttpToolClassifier, StreamingChatOrchestrator,
    SubmitOutcome, ToolDetector,
};
use render::StreamPrinter;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so they never interleave with the streamed reply
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

struct Session {
    config: CopilotConfig,
    registry: ToolRegistry,
    detector: ToolDetector,
    orchestrator: StreamingChatOrchestrator,
    canvas: mpsc::UnboundedReceiver<copilot_lib::CanvasItem>,
    preferences: Option<PreferencesStore>,
    extractor: ContentBlockExtractor,
    stdout: Stdout,
}

impl Session {
    async fn write(&mut self, text: &str) -> CopilotResult<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }

    fn extractor_for(config: &CopilotConfig, tool: &Tool) -> ContentBlockExtractor {
        ContentBlockExtractor::new(normalize_block_configs(
            &tool.collapsible_blocks,
            tool.hide_json_blocks || config.hide_json_blocks,
        ))
    }

    async fn switch_tool(&mut self, tool: Tool) -> CopilotResult<()> {
        self.extractor = Self::extractor_for(&self.config, &tool);
        let welcome = welcome_text(&tool);
        let id = tool.id.clone();
        self.orchestrator.switch_tool(tool).await;

        if let Some(preferences) = &self.preferences {
            preferences.update(|p| p.last_tool_id = Some(id)).await;
        }
        self.write(&format!("\n{}\n\n", welcome)).await
    }

    async fn handle_command(&mut self, command: &str) -> CopilotResult<bool> {
        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("/quit") | Some("/exit") => return Ok(false),
            Some("/tools") => {
                let listing = self
                    .registry
                    .iter()
                    .map(|t| format!("  {:<10} {}", t.id, t.name))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.write(&format!("{}\n", listing)).await?;
            }
            Some("/tool") => match parts.next().map(|id| self.registry.require(id).cloned()) {
                Some(Ok(tool)) => self.switch_tool(tool).await?,
                Some(Err(e)) => self.write(&format!("{}\n", e)).await?,
                None => self.write("Usage: /tool <id>\n").await?,
            },
            Some("/new") => {
                let tool = self.orchestrator.active_tool().await;
                self.switch_tool(tool).await?;
            }
            Some("/model") => match &self.preferences {
                Some(preferences) => {
                    let selected = parts.next().map(str::to_string);
                    preferences.update(|p| p.selected_model = selected).await;
                    let model = self.model().await;
                    self.write(&format!("Model: {}\n", model)).await?;
                }
                None => self.write("Preferences are unavailable\n").await?,
            },
            Some("/web") => match (parts.next().and_then(parse_switch), &self.preferences) {
                (Some(enabled), Some(preferences)) => {
                    preferences.update(|p| p.web_search_enabled = enabled).await;
                    let state = if enabled { "on" } else { "off" };
                    self.write(&format!("Web search {}\n", state)).await?;
                }
                (Some(_), None) => self.write("Preferences are unavailable\n").await?,
                (None, _) => self.write("Usage: /web on|off\n").await?,
            },
            _ => self.write("Unknown command\n").await?,
        }
        Ok(true)
    }

    /// Model for the next request, preferring the user's pick
    async fn model(&self) -> String {
        match &self.preferences {
            Some(preferences) => preferences.get().await.model_or(&self.config.model),
            None => self.config.model.clone(),
        }
    }

    /// Detect the tool for `text`, switching only on a confident match
    async fn route(&mut self, text: &str, model: &str) -> CopilotResult<()> {
        let detection = self.detector.detect(text, &self.registry, model).await;
        let active = self.orchestrator.active_tool().await;

        if let Some(tool) = detection.tool {
            if detection.source != DetectionSource::Fallback && tool.id != active.id {
                log::info!(
                    "Routing to {} ({:?}, confidence {:.2}): {}",
                    tool.id,
                    detection.source,
                    detection.confidence,
                    detection.reason
                );
                self.switch_tool(tool).await?;
            }
        }
        Ok(())
    }

    async fn print_progress(&mut self, printer: &mut StreamPrinter, final_pass: bool) -> CopilotResult<()> {
        let snapshot = self.orchestrator.snapshot();
        let complete = final_pass || matches!(snapshot.status, ChatStatus::Completed | ChatStatus::Error);
        let Some(message) = snapshot.last_message() else {
            return Ok(());
        };
        if message.from != MessageFrom::Assistant {
            return Ok(());
        }

        let delta = printer.delta(
            &message.key,
            &message.latest_version().content,
            &self.extractor,
            complete,
        );
        if let Some(delta) = delta {
            self.write(&delta).await?;
        }
        Ok(())
    }

    async fn turn(&mut self, text: String) -> CopilotResult<()> {
        let model = self.model().await;
        self.route(&text, &model).await?;

        let web_search = match &self.preferences {
            Some(preferences) => preferences.get().await.web_search_enabled,
            None => false,
        };
        let input = TurnInput::new(text, model)
            .with_temperature(self.config.temperature)
            .with_web_search(web_search);

        let orchestrator = self.orchestrator.clone();
        let mut snapshots = orchestrator.subscribe();
        let mut printer = StreamPrinter::new();
        let submit = orchestrator.submit(input);
        tokio::pin!(submit);

        let outcome = loop {
            tokio::select! {
                outcome = &mut submit => break outcome,
                changed = snapshots.changed() => {
                    if changed.is_ok() {
                        self.print_progress(&mut printer, false).await?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    if orchestrator.stop().await {
                        self.write("\n[stopped]\n").await?;
                    }
                }
            }
        };

        match outcome {
            SubmitOutcome::Completed { .. } | SubmitOutcome::Failed(_) => {
                self.print_progress(&mut printer, true).await?;
            }
            SubmitOutcome::Ignored => self.write("A reply is still streaming\n").await?,
            SubmitOutcome::Cancelled => {}
        }

        while let Ok(item) = self.canvas.try_recv() {
            let body = serde_json::to_string(&item.fields)?;
            self.write(&format!("  canvas> {} {}\n", item.id, body)).await?;
        }
        Ok(())
    }
}

/// Parse an on/off argument
fn parse_switch(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

async fn run() -> CopilotResult<()> {
    let config = CopilotConfig::from_env()?;
    let client = build_http_client(config.request_timeout())?;
    let registry = builtin_registry(&config.chat_endpoint, client.clone())?;

    let detector = match &config.classify_endpoint {
        Some(endpoint) => ToolDetector::new(Arc::new(HttpToolClassifier::new(client, endpoint.clone()))),
        None => ToolDetector::keyword_only(),
    }
    .with_threshold(config.confidence_threshold);

    let preferences = match PreferencesStore::load_default() {
        Ok(store) => Some(store),
        Err(e) => {
            log::warn!("Copilot preferences unavailable: {}", e);
            None
        }
    };
    let last_tool = match &preferences {
        Some(store) => store.get().await.last_tool_id,
        None => None,
    };
    let initial = last_tool
        .and_then(|id| registry.get(&id).cloned())
        .or_else(|| registry.fallback().cloned())
        .or_else(|| registry.iter().next().cloned())
        .ok_or_else(|| copilot_lib::CopilotError::InvalidRegistry("no tools registered".to_string()))?;

    let (sink, canvas) = ChannelCanvasSink::new();
    let orchestrator =
        StreamingChatOrchestrator::new(initial.clone(), Arc::new(sink), config.orchestrator_config());

    let mut session = Session {
        extractor: Session::extractor_for(&config, &initial),
        config,
        registry,
        detector,
        orchestrator,
        canvas,
        preferences,
        stdout: tokio::io::stdout(),
    };
    session.write(&format!("{}\n\n", welcome_text(&initial))).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        session.write("> ").await?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.starts_with('/') {
            if !session.handle_command(text).await? {
                break;
            }
            continue;
        }
        session.turn(text.to_string()).await?;
    }

    if let Some(preferences) = &session.preferences {
        preferences.save().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env (project root first, then current dir)
    let _ = dotenvy::from_filename("../.env").or_else(|_| dotenvy::dotenv());
    init_tracing();

    if let Err(e) = run().await {
        log::error!("copilot-console failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
