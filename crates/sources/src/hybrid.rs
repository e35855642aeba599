use gc_domain::trace::TraceEvent;
use gc_providers::AssistantAdapter;

use crate::static_source::StaticSource;
use crate::traits::ConversationSource;

/// Scripted lines, each optionally followed by the assistant's reply to it.
///
/// A failed or empty reply is skipped and the next scripted line follows.
pub struct HybridSource {
    script: StaticSource,
    adapter: Box<dyn AssistantAdapter>,
    get_responses: bool,
    awaiting_reply: Option<String>,
    produced: usize,
}

impl HybridSource {
    pub fn new(script: StaticSource, adapter: Box<dyn AssistantAdapter>, get_responses: bool) -> Self {
        tracing::info!(
            provider = adapter.provider_id(),
            lines = script.total_count(),
            get_responses,
            "hybrid conversation source ready"
        );
        Self {
            script,
            adapter,
            get_responses,
            awaiting_reply: None,
            produced: 0,
        }
    }

    pub fn script(&self) -> &StaticSource {
        &self.script
    }

    pub fn adapter_mut(&mut self) -> &mut dyn AssistantAdapter {
        self.adapter.as_mut()
    }
}

#[async_trait::async_trait]
impl ConversationSource for HybridSource {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    /// The script still has lines, or the reply to the last line is pending.
    fn has_more(&self) -> bool {
        self.script.has_more() || self.awaiting_reply.is_some()
    }

    async fn next(&mut self) -> Option<String> {
        if let Some(prompt) = self.awaiting_reply.take() {
            let reply = self.adapter.send_message(&prompt).await;
            match reply.usable_text() {
                Some(text) => {
                    self.produced += 1;
                    return Some(text.to_owned());
                }
                None => {
                    tracing::warn!(
                        provider = self.adapter.provider_id(),
                        error = reply.error.as_deref().unwrap_or("empty reply"),
                        "no assistant reply for scripted line"
                    );
                }
            }
        }

        let Some(line) = self.script.take_next() else {
            TraceEvent::SourceExhausted {
                source: self.name().into(),
                produced: self.produced,
            }
            .emit();
            return None;
        };

        self.produced += 1;
        if self.get_responses {
            self.awaiting_reply = Some(line.clone());
        }
        Some(line)
    }

    async fn reset(&mut self) {
        self.script.reset().await;
        self.adapter.clear_history();
        self.awaiting_reply = None;
        self.produced = 0;
    }
}
