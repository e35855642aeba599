//! Assistant-driven conversation.
//!
//! Seed prompts go out first. Once they run out, a fixed rotation of
//! generic follow-ups keeps the conversation going, but only after the
//! assistant has produced at least one reply. In context mode every prompt
//! is followed by the assistant's reply to it, which counts as a turn of
//! its own.

use gc_domain::trace::TraceEvent;
use gc_providers::AssistantAdapter;

use crate::traits::ConversationSource;

/// Follow-ups used once the seed prompts are exhausted.
pub const FOLLOW_UPS: [&str; 5] = [
    "Can you tell me more about that?",
    "That's interesting. What else?",
    "I see. Can you elaborate?",
    "Thanks! What would you recommend?",
    "Interesting perspective. Any other thoughts?",
];

/// Follow-up for the given number of turns already produced.
pub fn follow_up(turns_so_far: usize) -> &'static str {
    FOLLOW_UPS[(turns_so_far / 2) % FOLLOW_UPS.len()]
}

pub struct GeneratedSource {
    adapter: Box<dyn AssistantAdapter>,
    seeds: Vec<String>,
    max_turns: usize,
    context_mode: bool,
    turn: usize,
    seed_index: usize,
    generated: Vec<String>,
    /// Prompt whose reply is produced by the next `next` call.
    awaiting_reply: Option<String>,
}

impl GeneratedSource {
    pub fn new(
        adapter: Box<dyn AssistantAdapter>,
        seeds: Vec<String>,
        max_turns: usize,
        context_mode: bool,
    ) -> Self {
        tracing::info!(
            provider = adapter.provider_id(),
            seeds = seeds.len(),
            max_turns,
            context_mode,
            "generated conversation source ready"
        );
        Self {
            adapter,
            seeds,
            max_turns,
            context_mode,
            turn: 0,
            seed_index: 0,
            generated: Vec::new(),
            awaiting_reply: None,
        }
    }

    /// Texts produced so far, prompts and replies alike.
    pub fn turns(&self) -> usize {
        self.turn
    }

    /// Replies the assistant has contributed so far.
    pub fn generated(&self) -> &[String] {
        &self.generated
    }

    pub fn adapter_mut(&mut self) -> &mut dyn AssistantAdapter {
        self.adapter.as_mut()
    }

    fn finish(&mut self) -> Option<String> {
        self.awaiting_reply = None;
        TraceEvent::SourceExhausted {
            source: self.name().into(),
            produced: self.turn,
        }
        .emit();
        None
    }
}

#[async_trait::async_trait]
impl ConversationSource for GeneratedSource {
    fn name(&self) -> &'static str {
        "generated"
    }

    fn has_more(&self) -> bool {
        self.turn < self.max_turns
            && (self.awaiting_reply.is_some()
                || self.seed_index < self.seeds.len()
                || !self.generated.is_empty())
    }

    async fn next(&mut self) -> Option<String> {
        if let Some(prompt) = self.awaiting_reply.take() {
            if self.turn < self.max_turns {
                let reply = self.adapter.send_message(&prompt).await;
                match reply.usable_text() {
                    Some(text) => {
                        let text = text.to_owned();
                        self.generated.push(text.clone());
                        self.turn += 1;
                        return Some(text);
                    }
                    None => {
                        tracing::warn!(
                            provider = self.adapter.provider_id(),
                            error = reply.error.as_deref().unwrap_or("empty reply"),
                            "no assistant reply; continuing with the next prompt"
                        );
                    }
                }
            }
        }

        if self.turn >= self.max_turns {
            return self.finish();
        }

        let prompt = if let Some(seed) = self.seeds.get(self.seed_index) {
            self.seed_index += 1;
            seed.clone()
        } else if !self.generated.is_empty() {
            follow_up(self.turn).to_owned()
        } else {
            return self.finish();
        };

        self.turn += 1;
        if self.context_mode {
            self.awaiting_reply = Some(prompt.clone());
        }
        Some(prompt)
    }

    async fn reset(&mut self) {
        self.turn = 0;
        self.seed_index = 0;
        self.generated.clear();
        self.awaiting_reply = None;
        if !self.context_mode {
            self.adapter.clear_history();
        }
        tracing::debug!(context_mode = self.context_mode, "generated source reset");
    }
}
