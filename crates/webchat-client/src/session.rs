use serde::Serialize;

/// Mutable record of the one active chat session a client owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub chat_id: String,
    pub secure_key: String,
    pub user_id: String,
    pub alias: String,
    /// How much of the transcript has been consumed. Only moves forward
    /// through [`SessionState::advance`].
    pub transcript_position: u64,
    /// `{base}{service}/`; operation URLs append `{chatId}/{op}`.
    pub base_url: String,
}

impl SessionState {
    /// Move the cursor to `next` if it is ahead of the current position.
    ///
    /// Returns `true` when the cursor changed. A cursor behind the current
    /// one is ignored so the position never decreases.
    pub fn advance(&mut self, next: u64) -> bool {
        if next > self.transcript_position {
            self.transcript_position = next;
            true
        } else {
            if next < self.transcript_position {
                tracing::debug!(
                    chat_id = %self.chat_id,
                    current = self.transcript_position,
                    offered = next,
                    "ignoring backwards transcript position"
                );
            }
            false
        }
    }

    pub fn operation_url(&self, op: &str) -> String {
        format!("{}{}/{}", self.base_url, self.chat_id, op)
    }

    /// Form fields every post-create operation carries.
    pub fn common_fields(&self, message: &str) -> Vec<(String, String)> {
        vec![
            ("alias".into(), self.alias.clone()),
            ("secureKey".into(), self.secure_key.clone()),
            ("userId".into(), self.user_id.clone()),
            ("transcriptPosition".into(), self.transcript_position.to_string()),
            ("message".into(), message.to_owned()),
        ]
    }
}
