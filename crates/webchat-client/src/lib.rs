//! Client for a stateful web-chat gateway.
//!
//! Layers, bottom-up:
//!
//! * [`transport`] posts form bodies with retry and block classification.
//! * [`parser`] decodes the JSON response envelope into [`OperationResult`].
//! * [`session`] holds the identifiers and transcript cursor of one chat.
//! * [`client`] exposes the chat operations on top of the three.

pub mod client;
pub mod parser;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ProtocolClient;
pub use parser::{parse_envelope, parse_event};
pub use session::SessionState;
pub use transport::{classify, Outcome, Transport, RETRYABLE_STATUSES};
pub use types::{Event, EventType, OperationResult, Participant};
