use serde::Serialize;

/// Structured trace events emitted across all gchat-probe crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    GatewayCall {
        endpoint: String,
        status: u16,
        attempt: u32,
        duration_ms: u64,
    },
    RequestBlocked {
        endpoint: String,
        status: u16,
    },
    SessionStarted {
        chat_id: String,
        position: u64,
    },
    SessionEnded {
        chat_id: String,
        success: bool,
    },
    PositionAdvanced {
        chat_id: String,
        from: u64,
        to: u64,
    },
    AssistantRequest {
        provider: String,
        model: String,
        success: bool,
        duration_ms: u64,
    },
    SourceExhausted {
        source: String,
        produced: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "gc_event");
    }
}
