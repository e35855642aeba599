/// A pull-based producer of the outbound texts that drive a chat session.
///
/// `next` returning `None` is the termination signal; after that,
/// `has_more` is `false` until `reset`. Every implementation terminates
/// even when its assistant backend keeps failing.
#[async_trait::async_trait]
pub trait ConversationSource: Send {
    /// Short label for logs and trace events.
    fn name(&self) -> &'static str;

    /// Whether another `next` may yield a text.
    fn has_more(&self) -> bool;

    /// Produce the next outbound text. May call the assistant backend.
    async fn next(&mut self) -> Option<String>;

    /// Rewind to the first text.
    async fn reset(&mut self);
}
