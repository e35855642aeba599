//! Producers of outbound chat text.
//!
//! [`StaticSource`] replays a fixed script, [`GeneratedSource`] lets an
//! assistant backend carry the conversation, and [`HybridSource`]
//! interleaves a script with the assistant's replies. All three share the
//! pull contract of [`ConversationSource`].

pub mod generated;
pub mod hybrid;
pub mod static_source;
pub mod traits;

pub use generated::GeneratedSource;
pub use hybrid::HybridSource;
pub use static_source::StaticSource;
pub use traits::ConversationSource;
