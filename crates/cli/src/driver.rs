//! Session driver: opens a chat, feeds it from a conversation source, keeps
//! count of what happened to every message, and always tries to close the
//! session again.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use gc_domain::config::{Config, DriverConfig};
use gc_domain::error::{Error, ErrorKind, Result};
use gc_providers::{AssistantAdapter, OpenAiCompatAdapter};
use gc_sources::{ConversationSource, GeneratedSource, HybridSource, StaticSource};
use gc_webchat::{Event, EventType, OperationResult, ProtocolClient};

use crate::cli::{Mode, RunArgs};
use crate::payloads;

/// Message sent by `--mode simple`.
pub const SIMPLE_GREETING: &str = "Hello from gchat-probe! ¯\\_(ツ)_/¯";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Accounting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What became of one outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The gateway returned a success envelope.
    Accepted,
    /// The gateway answered with API-level errors.
    Rejected,
    /// The security layer refused the request.
    Blocked,
    /// Transport, protocol or session failure.
    Failed,
}

/// Per-run counters, one increment per outbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub blocked: usize,
    pub failed: usize,
    /// HTTP attempts made by the client, retries included.
    pub requests: u64,
}

impl RunSummary {
    pub fn record(&mut self, outcome: SendOutcome) {
        self.sent += 1;
        match outcome {
            SendOutcome::Accepted => self.accepted += 1,
            SendOutcome::Rejected => self.rejected += 1,
            SendOutcome::Blocked => self.blocked += 1,
            SendOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent {} | accepted {} | rejected {} | blocked {} | failed {} | HTTP requests {}",
            self.sent, self.accepted, self.rejected, self.blocked, self.failed, self.requests
        )
    }
}

fn classify(result: &Result<OperationResult>) -> SendOutcome {
    match result {
        Ok(r) if r.is_success() => SendOutcome::Accepted,
        Ok(_) => SendOutcome::Rejected,
        Err(e) if e.kind() == ErrorKind::Blocked => SendOutcome::Blocked,
        Err(_) => SendOutcome::Failed,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Driver {
    client: ProtocolClient,
    cfg: DriverConfig,
    summary: RunSummary,
    halted: bool,
}

impl Driver {
    pub fn new(client: ProtocolClient, cfg: DriverConfig) -> Self {
        Self {
            client,
            cfg,
            summary: RunSummary::default(),
            halted: false,
        }
    }

    pub fn client_mut(&mut self) -> &mut ProtocolClient {
        &mut self.client
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            requests: self.client.request_count(),
            ..self.summary
        }
    }

    /// `true` once `stop_on_block` has stopped the run.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Wait the initial delay, create the session, and fetch the opening
    /// transcript.
    pub async fn open(&mut self, initial_message: &str, user_fields: &HashMap<String, String>) -> Result<()> {
        pause(self.cfg.initial_delay_ms).await;
        self.client.start_session(initial_message, user_fields).await?;
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "initial refresh failed");
        }
        Ok(())
    }

    /// Fetch new transcript events.
    pub async fn refresh(&mut self) -> Result<Vec<Event>> {
        Ok(self.client.refresh(None).await?.events)
    }

    /// Pace, send one message, account for it, then refresh after the
    /// refresh delay.
    pub async fn send(&mut self, text: &str) -> SendOutcome {
        pause(self.cfg.delay_ms).await;

        let result = self.client.send_message(text).await;
        let outcome = classify(&result);
        self.summary.record(outcome);

        match (&outcome, &result) {
            (SendOutcome::Blocked, Err(e)) => {
                tracing::warn!(error = %e, "message blocked");
                if self.cfg.stop_on_block {
                    tracing::warn!("stopping run: stop_on_block is set");
                    self.halted = true;
                }
            }
            (SendOutcome::Failed, Err(Error::NoActiveSession)) => {
                tracing::error!("session is gone; stopping run");
                self.halted = true;
            }
            (SendOutcome::Failed, Err(e)) => {
                tracing::error!(error = %e, "message failed");
            }
            (SendOutcome::Rejected, Ok(r)) => {
                tracing::warn!(errors = %r.error_summary(), "message rejected by gateway");
            }
            _ => {}
        }

        if outcome == SendOutcome::Accepted {
            pause(self.cfg.refresh_delay_ms).await;
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "refresh after send failed");
            }
        }
        outcome
    }

    /// Send everything `source` produces, until it ends or the run halts.
    pub async fn run_source(&mut self, source: &mut dyn ConversationSource) {
        let mut index = 0usize;
        while !self.halted {
            let Some(text) = source.next().await else {
                break;
            };
            index += 1;
            tracing::info!(source = source.name(), index, "sending message");
            self.send(&text).await;
        }
    }

    /// Disconnect if a session is open. Failures are logged, not returned.
    pub async fn close(&mut self) {
        if !self.client.is_active() {
            return;
        }
        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(error = %e, "disconnect failed");
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run modes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Execute one `run` invocation: open the session, run the selected mode
/// (interruptible with Ctrl+C), and always attempt to disconnect.
pub async fn run(config: &Config, args: &RunArgs) -> anyhow::Result<RunSummary> {
    // Fail on missing mode inputs before any session is created.
    if matches!(args.mode, Mode::File | Mode::Hybrid) && args.file.is_none() {
        anyhow::bail!("--mode {:?} requires --file", args.mode);
    }
    let assistant = match args.mode {
        Mode::Generated | Mode::Hybrid => Some(OpenAiCompatAdapter::from_config(&config.assistant)?),
        _ => None,
    };
    let script = match (&args.mode, &args.file) {
        (Mode::File | Mode::Hybrid, Some(path)) => Some(StaticSource::from_file(path)?),
        _ => None,
    };

    let client = ProtocolClient::new(&config.gateway, &config.identity)?;
    let mut driver = Driver::new(client, config.driver.clone());

    let user_fields: HashMap<String, String> = args.user_data.iter().cloned().collect();
    driver.open(&args.initial_message, &user_fields).await?;

    let mode_result = tokio::select! {
        r = run_mode(&mut driver, config, args, assistant, script) => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted by user");
            Ok(())
        }
    };

    driver.close().await;
    let summary = driver.summary();
    tracing::info!(
        sent = summary.sent,
        accepted = summary.accepted,
        rejected = summary.rejected,
        blocked = summary.blocked,
        failed = summary.failed,
        requests = summary.requests,
        "run finished"
    );
    mode_result.map(|_| summary)
}

async fn run_mode(
    driver: &mut Driver,
    config: &Config,
    args: &RunArgs,
    assistant: Option<OpenAiCompatAdapter>,
    script: Option<StaticSource>,
) -> anyhow::Result<()> {
    match args.mode {
        Mode::Simple => {
            driver.send(SIMPLE_GREETING).await;
        }
        Mode::File => {
            let mut source = script.unwrap_or_default();
            driver.run_source(&mut source).await;
        }
        Mode::Payload => run_payloads(driver, args).await,
        Mode::Generated => {
            let mut adapter = require_assistant(assistant)?;
            if !adapter.start_session(None).await {
                anyhow::bail!("assistant session failed to start");
            }
            let mut source = GeneratedSource::new(
                Box::new(adapter),
                config.driver.seed_prompts.clone(),
                config.driver.max_turns,
                config.driver.context_mode,
            );
            driver.run_source(&mut source).await;
            source.adapter_mut().end_session().await;
        }
        Mode::Hybrid => {
            let mut adapter = require_assistant(assistant)?;
            if !adapter.start_session(None).await {
                anyhow::bail!("assistant session failed to start");
            }
            let mut source = HybridSource::new(
                script.unwrap_or_default(),
                Box::new(adapter),
                config.driver.get_responses,
            );
            driver.run_source(&mut source).await;
            source.adapter_mut().end_session().await;
        }
        Mode::Interactive => crate::interactive::run(driver).await?,
    }
    Ok(())
}

fn require_assistant(assistant: Option<OpenAiCompatAdapter>) -> anyhow::Result<OpenAiCompatAdapter> {
    assistant.ok_or_else(|| anyhow::anyhow!("assistant backend is not configured"))
}

/// Send every payload of the selected categories, category by category.
pub async fn run_payloads(driver: &mut Driver, args: &RunArgs) {
    for category in args.payload_type.expand() {
        if driver.halted() {
            break;
        }
        let texts = payloads::texts_for(category, args.encodings);
        tracing::info!(category = category.as_str(), count = texts.len(), "testing payload category");
        let mut source = StaticSource::from_lines(texts);
        driver.run_source(&mut source).await;
    }
}

/// Render a transcript event for the terminal.
pub fn format_event(event: &Event) -> Option<String> {
    match event.event_type {
        EventType::Message => Some(format!(
            "[{}] {}",
            event.sender(),
            event.text.as_deref().unwrap_or("")
        )),
        EventType::ParticipantJoined => Some(format!("* {} joined", event.sender())),
        EventType::ParticipantLeft => Some(format!("* {} left", event.sender())),
        EventType::TypingStarted | EventType::TypingStopped => None,
        other => Some(format!(
            "* {other}{}",
            event
                .text
                .as_deref()
                .map(|t| format!(": {t}"))
                .unwrap_or_default()
        )),
    }
}
