use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of the gateway's `errors[]` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiErrorInfo {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

impl fmt::Display for ApiErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(advice) = &self.advice {
            write!(f, " ({advice})")?;
        }
        Ok(())
    }
}

/// Shared error type used across all gchat-probe crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("auth: {0}")]
    Auth(String),

    #[error("no active chat session")]
    NoActiveSession,

    #[error("API statusCode {status_code}: {}", join_errors(.errors))]
    Api {
        status_code: i64,
        errors: Vec<ApiErrorInfo>,
    },

    #[error("connection: {0}")]
    Connection(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("protocol: {0}")]
    Protocol(String),

    /// A defensive security layer (WAF) rejected the request.
    #[error("blocked by security layer (HTTP {status}): {excerpt}")]
    Blocked { status: u16, excerpt: String },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("assistant {provider}: {message}")]
    Assistant { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure class, so driving code can branch without matching payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    NoActiveSession,
    Api,
    Connection,
    Timeout,
    Protocol,
    Blocked,
    HttpStatus,
    Assistant,
    Config,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(_) => ErrorKind::Authentication,
            Error::NoActiveSession => ErrorKind::NoActiveSession,
            Error::Api { .. } => ErrorKind::Api,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Protocol(_) | Error::Json(_) => ErrorKind::Protocol,
            Error::Blocked { .. } => ErrorKind::Blocked,
            Error::HttpStatus { .. } => ErrorKind::HttpStatus,
            Error::Assistant { .. } => ErrorKind::Assistant,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Error::Blocked { .. })
    }

    /// Failures that may succeed if the same operation is issued again later.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Connection(_) => true,
            Error::HttpStatus { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

fn join_errors(errors: &[ApiErrorInfo]) -> String {
    if errors.is_empty() {
        return "no error details".into();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
