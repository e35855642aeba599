use gc_domain::chat::ChatExchange;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of one assistant turn.
///
/// Failures are values, not errors: a conversation source that asks for a
/// reply must keep going (and keep counting turns) when the backend is down.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssistantReply {
    pub success: bool,
    /// The generated text. `None` on failure.
    pub reply_text: Option<String>,
    /// Human-readable failure reason. `None` on success.
    pub error: Option<String>,
}

impl AssistantReply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            reply_text: Some(text.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            reply_text: None,
            error: Some(error.into()),
        }
    }

    /// The reply text when the turn succeeded with something non-blank.
    pub fn usable_text(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.reply_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core adapter trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A backend that generates a reply to a prompt and keeps its own
/// conversation history.
///
/// The history is independent of the chat gateway transcript: it only
/// contains what was exchanged with this backend.
#[async_trait::async_trait]
pub trait AssistantAdapter: Send {
    /// A short identifier for logs (`"openai"`, `"groq"`, ...).
    fn provider_id(&self) -> &str;

    /// Reset the history to the system prompt and optionally send a first
    /// message. Returns `false` when that first message fails.
    async fn start_session(&mut self, initial_message: Option<&str>) -> bool;

    /// Append `message` as a user turn, ask the backend, and append the
    /// reply as an assistant turn on success.
    async fn send_message(&mut self, message: &str) -> AssistantReply;

    fn clear_history(&mut self);

    async fn end_session(&mut self) -> bool;

    fn history(&self) -> &[ChatExchange];
}
