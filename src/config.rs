//! Configuration loading.
//!
//! Server and exchange settings merge defaults, an optional YAML file, and
//! `WIDGET_`-prefixed environment variables, with CLI flags taking priority.
//! Assistant credentials load straight from the environment and never reach
//! the configuration surface the widget can see.

use std::env;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::assistant::{AssistantSettings, ExchangeSettings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Host address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Maximum run-status polls per exchange
    #[arg(long, env = "POLL_MAX_ATTEMPTS")]
    pub poll_max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Whole-request timeout; must outlast the poll budget.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Fixed wait between run-status polls.
    pub poll_interval_ms: u64,
    /// Poll cap; a run still pending after this many polls is declared stuck.
    pub poll_max_attempts: u32,
    /// Per-call timeout for upstream provider requests.
    pub upstream_timeout_secs: u64,
}

impl ExchangeConfig {
    /// Convert to the exchanger's timing settings.
    #[must_use]
    pub fn to_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_max_attempts: self.poll_max_attempts,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 180)?
            .set_default("exchange.poll_interval_ms", 2000)?
            .set_default("exchange.poll_max_attempts", 60)?
            .set_default("exchange.upstream_timeout_secs", 30)?;

        // Optional config file: explicit path first, then ./config.yaml
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }

        // Environment variables prefixed with WIDGET_, e.g. WIDGET_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("WIDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags (and their clap-bound env vars) win over everything else.
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(cap) = cli.poll_max_attempts {
            builder = builder.set_override("exchange.poll_max_attempts", i64::from(cap))?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

/// Load assistant provider settings from the environment.
///
/// # Errors
///
/// Returns a human-readable message when a required variable is missing or
/// empty; the caller is expected to refuse startup.
pub fn load_assistant_settings() -> Result<AssistantSettings, String> {
    let api_key = env::var("ASSISTANT_API_KEY")
        .map_err(|_| "Missing required env var: ASSISTANT_API_KEY".to_string())?;
    if api_key.trim().is_empty() {
        return Err("ASSISTANT_API_KEY cannot be empty".to_string());
    }

    let assistant_id = env::var("ASSISTANT_ID")
        .map_err(|_| "Missing required env var: ASSISTANT_ID".to_string())?;
    if assistant_id.trim().is_empty() {
        return Err("ASSISTANT_ID cannot be empty".to_string());
    }

    let base_url = env::var("ASSISTANT_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://api.openai.com".to_string());

    Ok(AssistantSettings {
        base_url,
        api_key,
        assistant_id,
    })
}
