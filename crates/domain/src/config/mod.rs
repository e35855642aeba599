mod assistant;
mod driver;
mod gateway;
mod identity;
mod secret;

pub use assistant::*;
pub use driver::*;
pub use gateway::*;
pub use identity::*;
pub use secret::{resolve_api_key, resolve_api_key_with};

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl Config {
    /// Apply `GCHAT_*` (and proxy) environment variables on top of the
    /// file values, reading the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Same as [`Config::apply_env_overrides`] with an injectable lookup.
    ///
    /// Unparseable numeric or boolean values are logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("GCHAT_BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Some(v) = get("GCHAT_SERVICE_NAME") {
            self.gateway.service_name = v;
        }
        if let Some(v) = get("GCHAT_API_KEY") {
            self.gateway.api_key = Some(v);
        }
        if let Some(v) = get("GCHAT_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => self.gateway.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid GCHAT_TIMEOUT_MS"),
            }
        }
        if let Some(v) = get("GCHAT_MAX_RETRIES") {
            match v.parse() {
                Ok(n) => self.gateway.max_retries = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid GCHAT_MAX_RETRIES"),
            }
        }
        if let Some(v) = get("GCHAT_VERIFY_TLS") {
            self.gateway.verify_tls = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("HTTP_PROXY") {
            self.gateway.proxy_http = Some(v);
        }
        if let Some(v) = get("HTTPS_PROXY") {
            self.gateway.proxy_https = Some(v);
        }
        if let Some(v) = get("GCHAT_NICKNAME") {
            self.identity.nickname = v;
        }
        if let Some(v) = get("GCHAT_FIRST_NAME") {
            self.identity.first_name = v;
        }
        if let Some(v) = get("GCHAT_LAST_NAME") {
            self.identity.last_name = v;
        }
        if let Some(v) = get("GCHAT_EMAIL") {
            self.identity.email_address = v;
        }
        if let Some(v) = get("GCHAT_SUBJECT") {
            self.identity.subject = v;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            issues.push(ConfigIssue {
                severity,
                field: field.into(),
                message: message.into(),
            });
        };

        if self.gateway.base_url.is_empty() {
            push(ConfigSeverity::Error, "gateway.base_url", "base_url must not be empty");
        } else if !self.gateway.base_url.starts_with("http://")
            && !self.gateway.base_url.starts_with("https://")
        {
            push(
                ConfigSeverity::Error,
                "gateway.base_url",
                "base_url must start with http:// or https://",
            );
        }

        if self.gateway.service_name.is_empty() {
            push(
                ConfigSeverity::Error,
                "gateway.service_name",
                "service_name must not be empty",
            );
        }

        if self.gateway.resolve_api_key().is_none() {
            push(
                ConfigSeverity::Error,
                "gateway.api_key",
                "no API key: set gateway.api_key or the gateway.api_key_env variable",
            );
        }

        if self.gateway.timeout_ms == 0 {
            push(
                ConfigSeverity::Error,
                "gateway.timeout_ms",
                "timeout must be greater than 0",
            );
        }

        if self.gateway.max_retries > 10 {
            push(
                ConfigSeverity::Warning,
                "gateway.max_retries",
                "more than 10 retries multiplies backoff delays considerably",
            );
        }

        if !self.gateway.verify_tls {
            push(
                ConfigSeverity::Warning,
                "gateway.verify_tls",
                "TLS certificate verification is disabled",
            );
        }

        if self.driver.max_turns == 0 {
            push(
                ConfigSeverity::Warning,
                "driver.max_turns",
                "generated conversations will produce no messages",
            );
        }

        issues
    }
}
