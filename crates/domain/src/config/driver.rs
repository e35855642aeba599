use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver pacing and source behaviour
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Pause before every outbound message.
    #[serde(default = "d_2000")]
    pub delay_ms: u64,
    /// Pause before the session is created.
    #[serde(default)]
    pub initial_delay_ms: u64,
    /// Pause between a send and the refresh that follows it.
    #[serde(default = "d_1000")]
    pub refresh_delay_ms: u64,
    /// Halt the run on the first request the security layer blocks.
    #[serde(default)]
    pub stop_on_block: bool,
    /// Upper bound on messages a generated conversation produces.
    #[serde(default = "d_10")]
    pub max_turns: usize,
    /// Let the assistant answer each generated prompt and keep its history
    /// across resets.
    #[serde(default = "d_true")]
    pub context_mode: bool,
    /// Interleave assistant replies after each scripted line (hybrid mode).
    #[serde(default = "d_true")]
    pub get_responses: bool,
    /// Opening prompts for generated conversations.
    #[serde(default = "default_seed_prompts")]
    pub seed_prompts: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2_000,
            initial_delay_ms: 0,
            refresh_delay_ms: 1_000,
            stop_on_block: false,
            max_turns: 10,
            context_mode: true,
            get_responses: true,
            seed_prompts: default_seed_prompts(),
        }
    }
}

pub fn default_seed_prompts() -> Vec<String> {
    vec![
        "Hello! Let's have a conversation.".into(),
        "Can you help me with something?".into(),
        "Tell me something interesting.".into(),
    ]
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2000() -> u64 {
    2_000
}
fn d_1000() -> u64 {
    1_000
}
fn d_10() -> usize {
    10
}
fn d_true() -> bool {
    true
}
