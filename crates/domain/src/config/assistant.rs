use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assistant (dialogue generation backend)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the OpenAI-compatible backend that generates dialogue.
///
/// `base_url`, `model` and `api_key_env` fall back to the named `preset`
/// (see `gc_providers::presets`) and finally to the OpenAI defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_500")]
    pub max_tokens: u32,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            preset: None,
            base_url: None,
            model: None,
            api_key: None,
            api_key_env: None,
            system_prompt: d_system_prompt(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_ms: 30_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_system_prompt() -> String {
    "You are a helpful assistant.".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_500() -> u32 {
    500
}
fn d_30000() -> u64 {
    30_000
}
