pub mod openai_compat;
pub mod presets;
pub mod traits;
pub mod util;

// Re-exports for convenience.
pub use openai_compat::OpenAiCompatAdapter;
pub use presets::Preset;
pub use traits::{AssistantAdapter, AssistantReply};
