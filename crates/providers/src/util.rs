//! Shared utility functions for assistant adapters.

use gc_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Connection`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Connection(e.to_string())
    }
}

/// Resolve an assistant API key: explicit `key` first (plaintext in config,
/// warned about), then the environment variable `env`.
pub fn resolve_api_key(key: Option<&str>, env: Option<&str>) -> Option<String> {
    if key.is_some_and(|k| !k.is_empty()) {
        tracing::warn!(
            "assistant API key loaded from plaintext config field 'api_key' - \
             prefer 'api_key_env' instead"
        );
    }
    gc_domain::config::resolve_api_key(key, env)
}
