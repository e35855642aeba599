//! Session-level protocol client.
//!
//! [`ProtocolClient`] owns at most one [`SessionState`] and drives every
//! chat operation through the [`Transport`] and the envelope parser. All
//! operations take `&mut self`, so one client never has two requests in
//! flight against the same session.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use gc_domain::config::{GatewayConfig, IdentityConfig};
use gc_domain::error::{Error, Result};
use gc_domain::trace::TraceEvent;
use tokio::io::AsyncWriteExt;

use crate::parser::parse_envelope;
use crate::session::SessionState;
use crate::transport::{from_reqwest, Transport};
use crate::types::{Event, EventType, OperationResult};

/// Client for one web chat session at a time.
#[derive(Debug)]
pub struct ProtocolClient {
    transport: Transport,
    /// `{base}{service}/`
    chat_base_url: String,
    identity: IdentityConfig,
    session: Option<SessionState>,
}

impl ProtocolClient {
    pub fn new(gateway: &GatewayConfig, identity: &IdentityConfig) -> Result<Self> {
        if gateway.base_url.is_empty() || gateway.service_name.is_empty() {
            return Err(Error::Config(
                "gateway.base_url and gateway.service_name must be set".into(),
            ));
        }
        let transport = Transport::new(gateway)?;
        let chat_base_url = format!(
            "{}{}/",
            gateway.normalized_base_url(),
            gateway.service_name.trim_matches('/')
        );

        Ok(Self {
            transport,
            chat_base_url,
            identity: identity.clone(),
            session: None,
        })
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.chat_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// HTTP attempts made by this client, retries included.
    pub fn request_count(&self) -> u64 {
        self.transport.request_count()
    }

    fn active(&self) -> Result<&SessionState> {
        self.session.as_ref().ok_or(Error::NoActiveSession)
    }

    // ── session lifecycle ────────────────────────────────────────────

    /// Create a chat session.
    ///
    /// Posts the configured identity, `userData[...]` from both the identity
    /// config and `user_fields`, and the optional initial text. A session
    /// that is already active is replaced.
    pub async fn start_session(
        &mut self,
        initial_text: &str,
        user_fields: &HashMap<String, String>,
    ) -> Result<SessionState> {
        if let Some(old) = &self.session {
            tracing::warn!(chat_id = %old.chat_id, "replacing active chat session without disconnect");
        }

        let mut fields: Vec<(String, String)> = vec![
            ("nickname".into(), self.identity.nickname.clone()),
            ("firstName".into(), self.identity.first_name.clone()),
            ("lastName".into(), self.identity.last_name.clone()),
            ("emailAddress".into(), self.identity.email_address.clone()),
            ("subject".into(), self.identity.subject.clone()),
            ("text".into(), initial_text.to_owned()),
        ];
        push_user_data(&mut fields, &self.identity.user_data);
        push_user_data(&mut fields, user_fields);

        tracing::info!(url = %self.chat_base_url, "starting chat session");
        let body = self.transport.post_form(&self.chat_base_url, &fields).await?;
        let result = parse_envelope(&body)?;

        if !result.is_success() {
            tracing::error!(status_code = result.status_code, errors = %result.error_summary(), "chat creation rejected");
            return Err(Error::Api {
                status_code: result.status_code,
                errors: result.errors,
            });
        }

        let require = |field: &Option<String>, name: &str| {
            field
                .clone()
                .ok_or_else(|| Error::Protocol(format!("create response is missing {name}")))
        };
        let state = SessionState {
            chat_id: require(&result.chat_id, "chatId")?,
            secure_key: require(&result.secure_key, "secureKey")?,
            user_id: require(&result.user_id, "userId")?,
            alias: result.alias.clone().unwrap_or_default(),
            transcript_position: result.next_position.unwrap_or(0),
            base_url: self.chat_base_url.clone(),
        };

        tracing::info!(chat_id = %state.chat_id, user_id = %state.user_id, "chat session started");
        TraceEvent::SessionStarted {
            chat_id: state.chat_id.clone(),
            position: state.transcript_position,
        }
        .emit();

        self.session = Some(state.clone());
        Ok(state)
    }

    /// Tear the session down. The local session is cleared whether or not
    /// the gateway accepts the request.
    pub async fn disconnect(&mut self) -> Result<OperationResult> {
        let session = self.session.take().ok_or(Error::NoActiveSession)?;
        tracing::info!(chat_id = %session.chat_id, "disconnecting");

        let outcome = async {
            let body = self
                .transport
                .post_form(&session.operation_url("disconnect"), &session.common_fields(""))
                .await?;
            parse_envelope(&body)
        }
        .await;

        let success = matches!(&outcome, Ok(r) if r.is_success());
        TraceEvent::SessionEnded {
            chat_id: session.chat_id.clone(),
            success,
        }
        .emit();

        match &outcome {
            Ok(r) if !r.is_success() => {
                tracing::warn!(chat_id = %session.chat_id, errors = %r.error_summary(), "disconnect returned API errors");
            }
            Err(e) => {
                tracing::warn!(chat_id = %session.chat_id, error = %e, "disconnect failed; session cleared locally");
            }
            _ => {}
        }
        outcome
    }

    // ── transcript ───────────────────────────────────────────────────

    /// Fetch new transcript events.
    ///
    /// `position_override` is sent instead of the local cursor (`1`
    /// replays the whole transcript). The cursor itself only moves when
    /// the response carries a newer `nextPosition`.
    pub async fn refresh(&mut self, position_override: Option<u64>) -> Result<OperationResult> {
        let extra = position_override
            .map(|pos| vec![("transcriptPosition".to_owned(), pos.to_string())])
            .unwrap_or_default();
        let result = self.post_operation("refresh", "", extra).await?;
        for event in &result.events {
            log_event(event);
        }
        Ok(result)
    }

    /// Refresh and keep only events of `event_type` when given.
    pub async fn poll_events(&mut self, event_type: Option<EventType>) -> Result<Vec<Event>> {
        let result = self.refresh(None).await?;
        Ok(result
            .events
            .into_iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .collect())
    }

    /// Poll `refresh` every `poll_interval` until an event of `event_type`
    /// arrives, failing with [`Error::Timeout`] once `timeout` has elapsed.
    pub async fn wait_for_event(
        &mut self,
        event_type: EventType,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Event> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(event) = self.poll_events(Some(event_type)).await?.into_iter().next() {
                return Ok(event);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(Error::Timeout(format!(
                    "no {event_type} event within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    // ── messaging ────────────────────────────────────────────────────

    pub async fn send_message(&mut self, text: &str) -> Result<OperationResult> {
        tracing::info!(text = %preview(text), "sending message");
        self.post_operation("send", text, Vec::new()).await
    }

    /// `message_type` defaults to `"notice"` on the gateway side when empty.
    pub async fn send_custom_notice(&mut self, message: &str, message_type: &str) -> Result<OperationResult> {
        let message_type = if message_type.is_empty() { "notice" } else { message_type };
        self.post_operation(
            "customNotice",
            message,
            vec![("messageType".into(), message_type.to_owned())],
        )
        .await
    }

    pub async fn send_typing_indicator(&mut self, started: bool) -> Result<OperationResult> {
        let op = if started { "startTyping" } else { "stopTyping" };
        self.post_operation(op, "", Vec::new()).await
    }

    /// Acknowledge everything up to `position`. The local cursor is not
    /// rewound by this call.
    pub async fn send_read_receipt(&mut self, position: u64) -> Result<OperationResult> {
        self.post_operation(
            "readReceipt",
            "",
            vec![("transcriptPosition".into(), position.to_string())],
        )
        .await
    }

    // ── participant data ─────────────────────────────────────────────

    pub async fn set_nickname(&mut self, nickname: &str) -> Result<OperationResult> {
        self.post_operation("updateNickname", "", vec![("nickname".into(), nickname.to_owned())])
            .await
    }

    pub async fn set_user_data(&mut self, data: &HashMap<String, String>) -> Result<OperationResult> {
        let mut extra = Vec::new();
        push_user_data(&mut extra, data);
        self.post_operation("updateData", "", extra).await
    }

    pub async fn set_push_url(&mut self, push_url: &str) -> Result<OperationResult> {
        self.post_operation("pushUrl", "", vec![("pushUrl".into(), push_url.to_owned())])
            .await
    }

    // ── files ────────────────────────────────────────────────────────

    pub async fn upload_file(&mut self, path: &Path, message: Option<&str>) -> Result<OperationResult> {
        let session = self.active()?;
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".into());

        tracing::info!(file = %path.display(), bytes = data.len(), "uploading file");
        let url = session.operation_url("file");
        let fields = session.common_fields(message.unwrap_or(""));
        let body = self
            .transport
            .post_multipart(&url, &fields, &file_name, &data)
            .await?;
        self.absorb("file", &body)
    }

    pub async fn list_file_limits(&mut self) -> Result<OperationResult> {
        self.post_operation("file/limits", "", Vec::new()).await
    }

    pub async fn delete_file(&mut self, file_id: &str) -> Result<OperationResult> {
        self.post_operation(&format!("file/{file_id}/delete"), "", Vec::new())
            .await
    }

    /// Stream a file to `dest` chunk by chunk. Returns the bytes written.
    pub async fn download_file(&mut self, file_id: &str, dest: &Path) -> Result<u64> {
        let session = self.active()?;
        let url = session.operation_url(&format!("file/{file_id}/download"));
        let resp = self
            .transport
            .post_stream(&url, &session.common_fields(""))
            .await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(from_reqwest)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(file_id, dest = %dest.display(), bytes = written, "file downloaded");
        Ok(written)
    }

    // ── shared plumbing ──────────────────────────────────────────────

    /// Post `op` with the common session fields, `message`, and `extra`
    /// fields (which replace common fields of the same name).
    async fn post_operation(
        &mut self,
        op: &str,
        message: &str,
        extra: Vec<(String, String)>,
    ) -> Result<OperationResult> {
        let session = self.active()?;
        let url = session.operation_url(op);
        let mut fields = session.common_fields(message);
        for (key, value) in extra {
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => fields.push((key, value)),
            }
        }

        tracing::debug!(op, position = session.transcript_position, "chat operation");
        let body = self.transport.post_form(&url, &fields).await?;
        self.absorb(op, &body)
    }

    /// Decode a body and fold its cursor into the session.
    fn absorb(&mut self, op: &str, body: &str) -> Result<OperationResult> {
        let result = parse_envelope(body)?;

        if !result.is_success() {
            tracing::warn!(
                op,
                status_code = result.status_code,
                errors = %result.error_summary(),
                "gateway reported API errors"
            );
        }

        if let (Some(next), Some(session)) = (result.next_position, self.session.as_mut()) {
            let from = session.transcript_position;
            if session.advance(next) {
                TraceEvent::PositionAdvanced {
                    chat_id: session.chat_id.clone(),
                    from,
                    to: next,
                }
                .emit();
            }
        }

        Ok(result)
    }
}

fn push_user_data(fields: &mut Vec<(String, String)>, data: &HashMap<String, String>) {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();
    for key in keys {
        fields.push((format!("userData[{key}]"), data[key].clone()));
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

fn log_event(event: &Event) {
    let index = event.index.map(|i| i.to_string()).unwrap_or_else(|| "?".into());
    match event.event_type {
        EventType::Message => {
            tracing::info!(index = %index, from = %event.sender(), text = event.text.as_deref().unwrap_or(""), "message");
        }
        EventType::TypingStarted | EventType::TypingStopped => {
            tracing::debug!(index = %index, kind = %event.event_type, "typing");
        }
        other => {
            tracing::info!(index = %index, kind = %other, from = %event.sender(), "transcript event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> GatewayConfig {
        GatewayConfig {
            base_url: "http://127.0.0.1:9/genesys/2/chat".into(),
            service_name: "Support".into(),
            api_key: Some("k".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn operations_without_session_fail() {
        let mut client = ProtocolClient::new(&gateway(), &IdentityConfig::default()).unwrap();
        assert!(matches!(client.send_message("hi").await, Err(Error::NoActiveSession)));
        assert!(matches!(client.refresh(None).await, Err(Error::NoActiveSession)));
        assert!(matches!(client.refresh(Some(1)).await, Err(Error::NoActiveSession)));
        assert!(matches!(client.disconnect().await, Err(Error::NoActiveSession)));
        assert!(matches!(client.list_file_limits().await, Err(Error::NoActiveSession)));
        assert!(matches!(
            client.download_file("f1", Path::new("/tmp/never")).await,
            Err(Error::NoActiveSession)
        ));
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn missing_service_is_config_error() {
        let cfg = GatewayConfig {
            service_name: String::new(),
            ..gateway()
        };
        assert!(matches!(
            ProtocolClient::new(&cfg, &IdentityConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn user_data_fields_are_bracketed_and_sorted() {
        let mut fields = Vec::new();
        let data: HashMap<String, String> =
            [("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())].into();
        push_user_data(&mut fields, &data);
        assert_eq!(
            fields,
            vec![
                ("userData[a]".to_string(), "1".to_string()),
                ("userData[b]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "ü".repeat(80);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 63);
        assert_eq!(preview("short"), "short");
    }
}
