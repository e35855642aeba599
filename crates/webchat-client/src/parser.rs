//! Pure decoding of the gateway response envelope.
//!
//! Decoding is deliberately lenient: unknown keys are ignored, unknown event
//! types become [`EventType::Unknown`], numbers sent as strings are accepted,
//! and absent optional numbers stay `None` so "no cursor" and "cursor 0"
//! remain distinguishable. Only a body that is not a JSON object fails.

use std::collections::HashMap;

use gc_domain::error::{ApiErrorInfo, Error, Result};
use serde_json::{Map, Value};

use crate::types::{Event, EventType, OperationResult, Participant};

/// Decode a raw response body.
pub fn parse_envelope(body: &str) -> Result<OperationResult> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::Protocol(format!("response is not JSON: {e}: {}", excerpt(body)))
    })?;
    parse_envelope_value(&value)
}

/// Decode an already-parsed JSON value.
pub fn parse_envelope_value(value: &Value) -> Result<OperationResult> {
    let obj = value.as_object().ok_or_else(|| {
        Error::Protocol(format!("response envelope is not an object: {}", excerpt(&value.to_string())))
    })?;

    let events = obj
        .get("messages")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_event).collect())
        .unwrap_or_default();

    let errors = obj
        .get("errors")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_error_info).collect())
        .unwrap_or_default();

    Ok(OperationResult {
        status_code: obj.get("statusCode").and_then(lenient_i64).unwrap_or(0),
        chat_id: string_field(obj, "chatId"),
        secure_key: string_field(obj, "secureKey"),
        user_id: string_field(obj, "userId"),
        alias: string_field(obj, "alias"),
        next_position: obj.get("nextPosition").and_then(lenient_u64),
        events,
        errors,
        chat_ended: obj.get("chatEnded").and_then(lenient_bool).unwrap_or(false),
        monitored: obj.get("monitored").and_then(lenient_bool).unwrap_or(false),
        idle_timer_expire: obj.get("idleTimerExpire").and_then(lenient_i64),
        user_data: obj.get("userData").map(string_map).unwrap_or_default(),
    })
}

/// Decode one element of `messages[]`. Non-object entries are skipped.
pub fn parse_event(value: &Value) -> Option<Event> {
    let obj = value.as_object()?;
    let event_type = obj
        .get("type")
        .and_then(Value::as_str)
        .map(EventType::from_wire)
        .unwrap_or(EventType::Unknown);

    Some(Event {
        event_type,
        index: obj.get("index").and_then(lenient_u64),
        text: string_field(obj, "text"),
        message_type: string_field(obj, "messageType"),
        from: obj.get("from").and_then(Value::as_object).map(|p| Participant {
            nickname: string_field(p, "nickname"),
            participant_id: p.get("participantId").and_then(lenient_i64),
            kind: string_field(p, "type"),
        }),
        utc_time: obj.get("utcTime").and_then(lenient_i64),
        user_data: obj.get("userData").map(string_map).unwrap_or_default(),
        event_attributes: obj.get("eventAttributes").cloned().unwrap_or(Value::Null),
    })
}

fn parse_error_info(value: &Value) -> Option<ApiErrorInfo> {
    let obj = value.as_object()?;
    Some(ApiErrorInfo {
        code: obj.get("code").and_then(lenient_i64).unwrap_or(0),
        message: string_field(obj, "message").unwrap_or_default(),
        advice: string_field(obj, "advice"),
    })
}

// ── leniency helpers ────────────────────────────────────────────────

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_map(v: &Value) -> HashMap<String, String> {
    let Some(obj) = v.as_object() else {
        return HashMap::new();
    };
    obj.iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

pub(crate) fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_owned();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_envelope_decodes() {
        let body = json!({
            "statusCode": 0,
            "chatId": "C1",
            "secureKey": "sk",
            "userId": "U1",
            "alias": "117",
            "nextPosition": 2,
            "chatEnded": false,
            "monitored": true,
            "idleTimerExpire": 300,
            "userData": {"lang": "en", "priority": 3},
            "messages": [{
                "type": "Message",
                "index": 1,
                "text": "welcome",
                "utcTime": 1700000000,
                "from": {"nickname": "Agent Smith", "participantId": 2, "type": "Agent"}
            }]
        })
        .to_string();

        let result = parse_envelope(&body).unwrap();
        assert!(result.is_success());
        assert_eq!(result.chat_id.as_deref(), Some("C1"));
        assert_eq!(result.next_position, Some(2));
        assert!(result.monitored);
        assert_eq!(result.idle_timer_expire, Some(300));
        assert_eq!(result.user_data.get("priority").map(String::as_str), Some("3"));

        let ev = &result.events[0];
        assert_eq!(ev.event_type, EventType::Message);
        assert_eq!(ev.index, Some(1));
        assert_eq!(ev.text.as_deref(), Some("welcome"));
        assert_eq!(ev.sender(), "Agent Smith");
        assert_eq!(ev.from.as_ref().unwrap().kind.as_deref(), Some("Agent"));
    }

    #[test]
    fn unknown_event_type_becomes_unknown() {
        let body = r#"{"statusCode":0,"messages":[{"type":"CoBrowseStarted","index":4}]}"#;
        let result = parse_envelope(body).unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].event_type, EventType::Unknown);
        assert_eq!(result.events[0].index, Some(4));
    }

    #[test]
    fn event_without_type_is_unknown() {
        let result = parse_envelope(r#"{"messages":[{"text":"?"}]}"#).unwrap();
        assert_eq!(result.events[0].event_type, EventType::Unknown);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let body = r#"{"statusCode":0,"futureField":{"x":1},"messages":[{"type":"Notice","newThing":true}]}"#;
        let result = parse_envelope(body).unwrap();
        assert_eq!(result.events[0].event_type, EventType::Notice);
    }

    #[test]
    fn missing_cursor_is_absent_not_zero() {
        let result = parse_envelope(r#"{"statusCode":0}"#).unwrap();
        assert_eq!(result.next_position, None);
        assert_eq!(result.idle_timer_expire, None);

        let result = parse_envelope(r#"{"statusCode":0,"nextPosition":0}"#).unwrap();
        assert_eq!(result.next_position, Some(0));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let result = parse_envelope(r#"{"statusCode":"0","nextPosition":"7"}"#).unwrap();
        assert_eq!(result.status_code, 0);
        assert_eq!(result.next_position, Some(7));
    }

    #[test]
    fn errors_array_marks_failure() {
        let body = r#"{"statusCode":1,"errors":[{"code":102,"message":"Chat session is ended","advice":"start again"}]}"#;
        let result = parse_envelope(body).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.errors[0].code, 102);
        assert_eq!(result.errors[0].advice.as_deref(), Some("start again"));
        assert_eq!(result.error_summary(), "102: Chat session is ended (start again)");
    }

    #[test]
    fn non_json_body_is_protocol_error() {
        let err = parse_envelope("<html>Service Unavailable</html>").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn non_object_json_is_protocol_error() {
        let err = parse_envelope("[1,2,3]").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = excerpt(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }
}
