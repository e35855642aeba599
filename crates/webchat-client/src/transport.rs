//! HTTP transport for the chat gateway.
//!
//! `Transport` wraps a pooled `reqwest::Client` configured from
//! [`GatewayConfig`] (API key header, proxies, TLS verification, timeout)
//! and runs every request through one retry engine:
//!
//! * 429 / 500 / 502 / 503 / 504 are retried with exponential back-off.
//! * HTTP 403, or a non-envelope body carrying the firewall's rejection
//!   token, is classified [`Error::Blocked`] and never retried, even when
//!   the status is also in the retryable set. JSON envelopes are never
//!   treated as block pages, so transcript text mentioning the token does
//!   not stall the session.
//! * 401 surfaces as [`Error::Auth`]; any other non-2xx as
//!   [`Error::HttpStatus`] on first occurrence.
//! * Timeouts and connection failures abort immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use gc_domain::config::GatewayConfig;
use gc_domain::error::{Error, Result};
use gc_domain::trace::TraceEvent;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use crate::parser::excerpt;

/// Statuses the retry engine treats as transient.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What one HTTP attempt amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Blocked,
    Retry,
    Unauthorized,
    Failed,
}

/// Classify a response. Block detection runs first so a blocked request is
/// never retried.
pub fn classify(status: u16, body: &str, block_marker: &str) -> Outcome {
    if status == 403 || is_block_page(body, block_marker) {
        return Outcome::Blocked;
    }
    if RETRYABLE_STATUSES.contains(&status) {
        return Outcome::Retry;
    }
    match status {
        200..=299 => Outcome::Success,
        401 => Outcome::Unauthorized,
        _ => Outcome::Failed,
    }
}

/// A body carrying the marker that is not a JSON object envelope.
fn is_block_page(body: &str, block_marker: &str) -> bool {
    !block_marker.is_empty()
        && body.contains(block_marker)
        && !serde_json::from_str::<serde_json::Value>(body).is_ok_and(|v| v.is_object())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Form-encoded POST transport with retry and block classification.
///
/// Created once per protocol client; the underlying `reqwest::Client`
/// keeps a connection pool across calls.
#[derive(Debug)]
pub struct Transport {
    http: Client,
    max_retries: u32,
    backoff: Duration,
    block_marker: String,
    requests: AtomicU64,
}

impl Transport {
    /// Build a transport. Fails with [`Error::Auth`] when no API key
    /// resolves and with [`Error::Config`] on invalid proxies or headers.
    pub fn new(cfg: &GatewayConfig) -> Result<Self> {
        let api_key = cfg.resolve_api_key().ok_or_else(|| {
            Error::Auth(format!(
                "no API key configured: set gateway.api_key or {}",
                cfg.api_key_env
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert("apikey", header_value(&api_key)?);
        for (name, value) in &cfg.custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name {name:?}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .default_headers(headers)
            .danger_accept_invalid_certs(!cfg.verify_tls);

        if let Some(ua) = &cfg.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(proxy) = &cfg.proxy_http {
            builder = builder.proxy(
                reqwest::Proxy::http(proxy)
                    .map_err(|e| Error::Config(format!("invalid HTTP proxy {proxy}: {e}")))?,
            );
        }
        if let Some(proxy) = &cfg.proxy_https {
            builder = builder.proxy(
                reqwest::Proxy::https(proxy)
                    .map_err(|e| Error::Config(format!("invalid HTTPS proxy {proxy}: {e}")))?,
            );
        }

        let http = builder.build().map_err(from_reqwest)?;

        Ok(Self {
            http,
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
            block_marker: cfg.block_marker.clone(),
            requests: AtomicU64::new(0),
        })
    }

    /// Number of HTTP attempts made so far, retries included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// POST form fields and return the raw body of a 2xx response.
    pub async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
        let resp = self
            .execute_with_retry(url, || self.http.post(url).form(fields))
            .await?;
        self.read_body(url, resp).await
    }

    /// POST a multipart body with the form fields plus one file part.
    pub async fn post_multipart(
        &self,
        url: &str,
        fields: &[(String, String)],
        file_name: &str,
        data: &[u8],
    ) -> Result<String> {
        let resp = self
            .execute_with_retry(url, || {
                let mut form = reqwest::multipart::Form::new();
                for (k, v) in fields {
                    form = form.text(k.clone(), v.clone());
                }
                let part = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(file_name.to_owned());
                self.http.post(url).multipart(form.part("file", part))
            })
            .await?;
        self.read_body(url, resp).await
    }

    /// POST form fields and hand back the 2xx response unread, for
    /// streaming large bodies. Only the status is classified.
    pub async fn post_stream(&self, url: &str, fields: &[(String, String)]) -> Result<Response> {
        self.execute_with_retry(url, || self.http.post(url).form(fields))
            .await
    }

    async fn read_body(&self, url: &str, resp: Response) -> Result<String> {
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(from_reqwest)?;
        if classify(status, &body, &self.block_marker) == Outcome::Blocked {
            return Err(self.blocked(url, status, &body));
        }
        Ok(body)
    }

    fn blocked(&self, url: &str, status: u16, body: &str) -> Error {
        tracing::warn!(endpoint = %url, status, body = %excerpt(body), "request blocked by security layer");
        TraceEvent::RequestBlocked {
            endpoint: url.to_owned(),
            status,
        }
        .emit();
        Error::Blocked {
            status,
            excerpt: excerpt(body),
        }
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request, retrying transient statuses with exponential
    /// back-off. Returns the response only for a 2xx status.
    async fn execute_with_retry(
        &self,
        url: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let backoff = self.backoff.saturating_mul(2u32.saturating_pow(attempt - 1));
                tracing::debug!(endpoint = %url, attempt, backoff_ms = backoff.as_millis() as u64, "retrying");
                tokio::time::sleep(backoff).await;
            }

            self.requests.fetch_add(1, Ordering::Relaxed);
            let start = Instant::now();
            let result = build_request()
                .header("X-Request-Id", Uuid::new_v4().to_string())
                .send()
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(endpoint = %url, attempt, error = %e, "gateway request failed");
                    return Err(from_reqwest(e));
                }
            };

            let status = resp.status().as_u16();
            TraceEvent::GatewayCall {
                endpoint: url.to_owned(),
                status,
                attempt: attempt + 1,
                duration_ms,
            }
            .emit();

            if resp.status().is_success() {
                return Ok(resp);
            }

            let body = resp.text().await.unwrap_or_default();
            match classify(status, &body, &self.block_marker) {
                Outcome::Blocked => return Err(self.blocked(url, status, &body)),
                Outcome::Retry if attempt < self.max_retries => {
                    tracing::warn!(endpoint = %url, status, attempt = attempt + 1, "transient gateway status");
                    attempt += 1;
                }
                Outcome::Unauthorized => {
                    return Err(Error::Auth(format!(
                        "{url} rejected the API key ({status}): {}",
                        excerpt(&body)
                    )));
                }
                _ => {
                    return Err(Error::HttpStatus {
                        status,
                        body: excerpt(&body),
                    });
                }
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config(format!("invalid header value: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeouts become `Error::Timeout`, body decoding failures
/// `Error::Protocol`, everything else `Error::Connection`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else if e.is_decode() {
        Error::Protocol(e.to_string())
    } else {
        Error::Connection(e.to_string())
    }
}
