use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat gateway connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where and how to reach the web chat gateway.
///
/// Endpoints are built as `{base_url}{service_name}/` (create) and
/// `{base_url}{service_name}/{chatId}/{op}` for everything else, so
/// `base_url` normally ends in `/genesys/2/chat/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub service_name: String,
    /// Plaintext API key. Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// Retries on transient statuses (429/500/502/503/504) after the first attempt.
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// First backoff delay; doubles on every further retry.
    #[serde(default = "d_1000")]
    pub retry_backoff_ms: u64,
    #[serde(default = "d_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub proxy_http: Option<String>,
    #[serde(default)]
    pub proxy_https: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Literal token the firewall rejection page carries in its body.
    #[serde(default = "d_block_marker")]
    pub block_marker: String,
    /// Extra headers sent on every request.
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            service_name: String::new(),
            api_key: None,
            api_key_env: d_api_key_env(),
            timeout_ms: 30_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            verify_tls: true,
            proxy_http: None,
            proxy_https: None,
            user_agent: None,
            block_marker: d_block_marker(),
            custom_headers: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Split a full chat URL such as
    /// `https://gms.example.com/genesys/2/chat/MyService/` into base URL and
    /// service name. The last path segment is the service name.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim().trim_end_matches('/');
        let (base, service) = match trimmed.rsplit_once('/') {
            Some((base, service)) if !base.ends_with(':') && !base.ends_with('/') => {
                (format!("{base}/"), service.to_owned())
            }
            _ => (format!("{trimmed}/"), String::new()),
        };
        Self {
            base_url: base,
            service_name: service,
            ..Self::default()
        }
    }

    /// Base URL normalized to end with exactly one `/`.
    pub fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }

    /// Resolve the API key: plaintext field first, then `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_from(|name| std::env::var(name).ok())
    }

    /// [`Self::resolve_api_key`] with an injectable environment lookup.
    pub fn resolve_api_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        super::resolve_api_key_with(self.api_key.as_deref(), Some(&self.api_key_env), lookup)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_key_env() -> String {
    "GCHAT_API_KEY".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_3() -> u32 {
    3
}
fn d_1000() -> u64 {
    1_000
}
fn d_true() -> bool {
    true
}
fn d_block_marker() -> String {
    "Forbidden".into()
}
