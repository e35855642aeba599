//! Typed views of the gateway's response envelope and transcript events.
//!
//! Values are produced by [`crate::parser`]; nothing here talks to the
//! network.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use gc_domain::error::ApiErrorInfo;
use serde::Serialize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Kind of transcript event. Unrecognized wire values map to
/// [`EventType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    Message,
    ParticipantJoined,
    ParticipantLeft,
    TypingStarted,
    TypingStopped,
    NicknameUpdated,
    PushUrl,
    FileUploaded,
    FileDeleted,
    CustomNotice,
    Notice,
    IdleAlert,
    IdleClose,
    Unknown,
}

impl EventType {
    pub const ALL: [EventType; 14] = [
        EventType::Message,
        EventType::ParticipantJoined,
        EventType::ParticipantLeft,
        EventType::TypingStarted,
        EventType::TypingStopped,
        EventType::NicknameUpdated,
        EventType::PushUrl,
        EventType::FileUploaded,
        EventType::FileDeleted,
        EventType::CustomNotice,
        EventType::Notice,
        EventType::IdleAlert,
        EventType::IdleClose,
        EventType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Message => "Message",
            EventType::ParticipantJoined => "ParticipantJoined",
            EventType::ParticipantLeft => "ParticipantLeft",
            EventType::TypingStarted => "TypingStarted",
            EventType::TypingStopped => "TypingStopped",
            EventType::NicknameUpdated => "NicknameUpdated",
            EventType::PushUrl => "PushUrl",
            EventType::FileUploaded => "FileUploaded",
            EventType::FileDeleted => "FileDeleted",
            EventType::CustomNotice => "CustomNotice",
            EventType::Notice => "Notice",
            EventType::IdleAlert => "IdleAlert",
            EventType::IdleClose => "IdleClose",
            EventType::Unknown => "Unknown",
        }
    }

    /// Map a wire string; never fails.
    pub fn from_wire(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .unwrap_or(EventType::Unknown)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `from` object of an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Participant {
    pub nickname: Option<String>,
    pub participant_id: Option<i64>,
    /// `Client`, `Agent`, `External`, ...
    pub kind: Option<String>,
}

/// One indexed occurrence in the session transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_type: EventType,
    /// Server-assigned, strictly increasing within a session.
    pub index: Option<u64>,
    pub text: Option<String>,
    pub message_type: Option<String>,
    pub from: Option<Participant>,
    /// `utcTime`, seconds since the epoch.
    pub utc_time: Option<i64>,
    pub user_data: HashMap<String, String>,
    pub event_attributes: serde_json::Value,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            index: None,
            text: None,
            message_type: None,
            from: None,
            utc_time: None,
            user_data: HashMap::new(),
            event_attributes: serde_json::Value::Null,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.utc_time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    pub fn sender(&self) -> &str {
        self.from
            .as_ref()
            .and_then(|p| p.nickname.as_deref())
            .unwrap_or("unknown")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decoded response envelope of any chat operation.
///
/// A non-success envelope is still a value: callers decide whether the
/// API-level error aborts what they are doing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OperationResult {
    pub status_code: i64,
    pub chat_id: Option<String>,
    pub secure_key: Option<String>,
    pub user_id: Option<String>,
    pub alias: Option<String>,
    /// Absent when the gateway did not send a cursor.
    pub next_position: Option<u64>,
    pub events: Vec<Event>,
    pub errors: Vec<ApiErrorInfo>,
    pub chat_ended: bool,
    pub monitored: bool,
    pub idle_timer_expire: Option<i64>,
    pub user_data: HashMap<String, String>,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 0 && self.errors.is_empty()
    }

    /// `"code: message, ..."` for logging.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn events_of(&self, event_type: EventType) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.event_type == event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_through_from_wire() {
        for t in EventType::ALL {
            assert_eq!(EventType::from_wire(t.as_str()), t);
        }
        assert_eq!(EventType::from_wire("CoBrowseStarted"), EventType::Unknown);
    }

    #[test]
    fn success_requires_zero_status_and_no_errors() {
        let mut result = OperationResult::default();
        assert!(result.is_success());

        result.errors.push(ApiErrorInfo {
            code: 102,
            message: "ended".into(),
            advice: None,
        });
        assert!(!result.is_success());

        let result = OperationResult {
            status_code: 2,
            ..Default::default()
        };
        assert!(!result.is_success());
    }

    #[test]
    fn timestamp_converts_seconds() {
        let mut ev = Event::new(EventType::Message);
        ev.utc_time = Some(1_700_000_000);
        assert_eq!(ev.timestamp().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(ev.sender(), "unknown");
    }
}
