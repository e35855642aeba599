pub mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gc_domain::config::{Config, GatewayConfig};

use crate::payloads::PayloadCategory;

/// gchat-probe: drive web-chat gateway sessions and probe the security
/// layer in front of them.
#[derive(Debug, Parser)]
#[command(name = "gchat-probe", version, about)]
pub struct Cli {
    /// Debug-level logging (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a chat session and drive it (default: `run --mode simple`).
    Run(RunArgs),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the built-in probe payloads.
    Payloads {
        #[arg(value_enum, default_value_t = PayloadCategory::All)]
        category: PayloadCategory,
        /// Include the encoded variants of each payload.
        #[arg(long)]
        encodings: bool,
    },
    /// List the assistant presets.
    Presets,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// How the driver produces outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Send one greeting, then refresh.
    Simple,
    /// Send each line of `--file`.
    File,
    /// Send the built-in probe payloads.
    Payload,
    /// Let the assistant backend carry the conversation.
    Generated,
    /// Send each line of `--file`, each followed by the assistant's reply.
    Hybrid,
    /// Type messages at a prompt.
    Interactive,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(short, long, value_enum, default_value_t = Mode::Simple)]
    pub mode: Mode,

    // ── gateway ──────────────────────────────────────────────────
    /// Full chat URL, e.g. `https://gms.example.com/genesys/2/chat/Support/`.
    #[arg(long, conflicts_with_all = ["base_url", "service"])]
    pub url: Option<String>,
    /// Base URL up to and including `/chat/`.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Chat service name.
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub proxy_http: Option<String>,
    #[arg(long)]
    pub proxy_https: Option<String>,
    /// Skip TLS certificate verification.
    #[arg(long)]
    pub insecure: bool,

    // ── identity ─────────────────────────────────────────────────
    #[arg(long)]
    pub nickname: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    /// Extra `userData` field sent at session start (repeatable).
    #[arg(long = "user-data", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub user_data: Vec<(String, String)>,
    /// Text sent along with the session-create request.
    #[arg(long, default_value = "")]
    pub initial_message: String,

    // ── sources ──────────────────────────────────────────────────
    /// Message script, one message per line (file and hybrid modes).
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    #[arg(short = 'p', long, value_enum, default_value_t = PayloadCategory::All)]
    pub payload_type: PayloadCategory,
    /// Also send the encoded variants of each payload.
    #[arg(long)]
    pub encodings: bool,
    /// Assistant preset (openai, groq, together).
    #[arg(long)]
    pub preset: Option<String>,
    /// Assistant model override.
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub max_turns: Option<usize>,
    /// Do not ask the assistant to answer generated prompts.
    #[arg(long)]
    pub no_context: bool,
    /// Do not interleave assistant replies in hybrid mode.
    #[arg(long)]
    pub no_responses: bool,

    // ── pacing ───────────────────────────────────────────────────
    /// Pause before every message, in milliseconds.
    #[arg(short, long)]
    pub delay_ms: Option<u64>,
    /// Pause before the session is created, in milliseconds.
    #[arg(long)]
    pub initial_delay_ms: Option<u64>,
    /// Stop the run on the first blocked request.
    #[arg(long)]
    pub stop_on_block: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            mode: Mode::Simple,
            url: None,
            base_url: None,
            service: None,
            api_key: None,
            proxy_http: None,
            proxy_https: None,
            insecure: false,
            nickname: None,
            first_name: None,
            last_name: None,
            email: None,
            subject: None,
            user_data: Vec::new(),
            initial_message: String::new(),
            file: None,
            payload_type: PayloadCategory::All,
            encodings: false,
            preset: None,
            model: None,
            max_turns: None,
            no_context: false,
            no_responses: false,
            delay_ms: None,
            initial_delay_ms: None,
            stop_on_block: false,
        }
    }
}

impl RunArgs {
    /// Layer the command-line flags over a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        let gw = &mut config.gateway;
        if let Some(url) = &self.url {
            let split = GatewayConfig::from_url(url);
            gw.base_url = split.base_url;
            gw.service_name = split.service_name;
        }
        set(&mut gw.base_url, &self.base_url);
        set(&mut gw.service_name, &self.service);
        if self.api_key.is_some() {
            gw.api_key = self.api_key.clone();
        }
        if self.proxy_http.is_some() {
            gw.proxy_http = self.proxy_http.clone();
        }
        if self.proxy_https.is_some() {
            gw.proxy_https = self.proxy_https.clone();
        }
        if self.insecure {
            gw.verify_tls = false;
        }

        let id = &mut config.identity;
        set(&mut id.nickname, &self.nickname);
        set(&mut id.first_name, &self.first_name);
        set(&mut id.last_name, &self.last_name);
        set(&mut id.email_address, &self.email);
        set(&mut id.subject, &self.subject);

        if self.preset.is_some() {
            config.assistant.preset = self.preset.clone();
        }
        if self.model.is_some() {
            config.assistant.model = self.model.clone();
        }

        let drv = &mut config.driver;
        if let Some(n) = self.max_turns {
            drv.max_turns = n;
        }
        if self.no_context {
            drv.context_mode = false;
        }
        if self.no_responses {
            drv.get_responses = false;
        }
        if let Some(ms) = self.delay_ms {
            drv.delay_ms = ms;
        }
        if let Some(ms) = self.initial_delay_ms {
            drv.initial_delay_ms = ms;
        }
        if self.stop_on_block {
            drv.stop_on_block = true;
        }
    }
}

fn set(slot: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_owned(), v.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `GCHAT_CONFIG` (or
/// `gchat-probe.toml` by default), then apply `GCHAT_*` environment
/// overrides. Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("GCHAT_CONFIG").unwrap_or_else(|_| "gchat-probe.toml".into());

    let mut config: Config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        tracing::debug!(path = %config_path, "no config file; using defaults");
        Config::default()
    };
    config.apply_env_overrides();

    Ok((config, config_path))
}
