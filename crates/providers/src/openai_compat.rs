//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Groq, Together, and any other endpoint that follows
//! the OpenAI chat completions contract.

use std::time::{Duration, Instant};

use gc_domain::chat::{ChatExchange, ChatRole};
use gc_domain::config::AssistantConfig;
use gc_domain::error::{Error, Result};
use gc_domain::trace::TraceEvent;
use serde_json::Value;

use crate::presets;
use crate::traits::{AssistantAdapter, AssistantReply};
use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An assistant adapter for any OpenAI-compatible chat completions API.
///
/// Holds the full exchange history and sends all of it with every request,
/// so the backend sees the conversation so far.
pub struct OpenAiCompatAdapter {
    id: String,
    chat_url: String,
    api_key: Option<String>,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
    history: Vec<ChatExchange>,
    session_active: bool,
}

impl std::fmt::Debug for OpenAiCompatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatAdapter")
            .field("id", &self.id)
            .field("chat_url", &self.chat_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl OpenAiCompatAdapter {
    /// Create an adapter from the `[assistant]` config section.
    ///
    /// Explicit `base_url` / `model` / `api_key_env` win over the named
    /// preset, which wins over the OpenAI defaults. An unknown preset name is
    /// a [`Error::Config`]. A missing API key is not an error here; every
    /// `send_message` then fails without touching the network.
    pub fn from_config(cfg: &AssistantConfig) -> Result<Self> {
        let preset = match cfg.preset.as_deref() {
            Some(name) => presets::lookup(name).ok_or_else(|| {
                Error::Config(format!(
                    "unknown assistant preset '{name}' (known: {})",
                    presets::names().join(", ")
                ))
            })?,
            None => &presets::OPENAI,
        };

        let base_url = cfg.base_url.as_deref().unwrap_or(preset.base_url);
        let model = cfg.model.clone().unwrap_or_else(|| preset.model.to_owned());
        let key_env = cfg.api_key_env.as_deref().unwrap_or(preset.api_key_env);
        let api_key = resolve_api_key(cfg.api_key.as_deref(), Some(key_env));
        if api_key.is_none() {
            tracing::warn!(provider = preset.name, env_var = %key_env, "no assistant API key configured");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        let chat_url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        tracing::info!(provider = preset.name, url = %chat_url, model = %model, "assistant adapter ready");

        Ok(Self {
            id: preset.name.to_owned(),
            chat_url,
            api_key,
            model,
            system_prompt: cfg.system_prompt.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client,
            history: Vec::new(),
            session_active: false,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_chat_body(&self) -> Value {
        let messages: Vec<Value> = self.history.iter().map(exchange_to_openai).collect();
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }

    async fn chat(&self, api_key: &str) -> Result<String> {
        let body = self.build_chat_body();

        tracing::debug!(provider = %self.id, url = %self.chat_url, turns = self.history.len(), "assistant chat request");

        let resp = self
            .client
            .post(&self.chat_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            let mut excerpt: String = resp_text.chars().take(200).collect();
            if excerpt.len() < resp_text.len() {
                excerpt.push_str("...");
            }
            return Err(Error::Assistant {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), excerpt),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&self.id, &resp_json)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn exchange_to_openai(ex: &ChatExchange) -> Value {
    serde_json::json!({
        "role": ex.role.as_str(),
        "content": ex.content,
    })
}

fn parse_chat_response(provider: &str, body: &Value) -> Result<String> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Assistant {
            provider: provider.into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Assistant {
        provider: provider.into(),
        message: "no message in choice".into(),
    })?;

    Ok(message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string())
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(60).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl AssistantAdapter for OpenAiCompatAdapter {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn start_session(&mut self, initial_message: Option<&str>) -> bool {
        tracing::info!(provider = %self.id, "starting assistant session");
        self.clear_history();
        self.history.push(ChatExchange::system(self.system_prompt.clone()));

        if let Some(initial) = initial_message {
            let reply = self.send_message(initial).await;
            if !reply.success {
                tracing::error!(provider = %self.id, error = reply.error.as_deref().unwrap_or(""), "assistant session failed to start");
                return false;
            }
        }

        self.session_active = true;
        true
    }

    async fn send_message(&mut self, message: &str) -> AssistantReply {
        let Some(api_key) = self.api_key.clone() else {
            tracing::error!(provider = %self.id, "assistant API key not configured");
            return AssistantReply::failed("API key not configured");
        };

        self.history.push(ChatExchange::user(message));
        tracing::info!(provider = %self.id, text = %preview(message), "assistant prompt");

        let start = Instant::now();
        let outcome = self.chat(&api_key).await;
        TraceEvent::AssistantRequest {
            provider: self.id.clone(),
            model: self.model.clone(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        match outcome {
            Ok(text) => {
                tracing::info!(provider = %self.id, text = %preview(&text), "assistant reply");
                self.history.push(ChatExchange::assistant(text.clone()));
                AssistantReply::ok(text)
            }
            Err(e) => {
                tracing::error!(provider = %self.id, error = %e, "assistant request failed");
                AssistantReply::failed(e.to_string())
            }
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }

    async fn end_session(&mut self) -> bool {
        if !self.session_active {
            tracing::warn!(provider = %self.id, "no active assistant session to end");
            return false;
        }
        let exchanged = self
            .history
            .iter()
            .filter(|e| e.role != ChatRole::System)
            .count();
        tracing::info!(provider = %self.id, messages = exchanged, "assistant session ended");
        self.session_active = false;
        true
    }

    fn history(&self) -> &[ChatExchange] {
        &self.history
    }
}
