use crate::llm::GeminiSettings;
use crate::widget::PlaceholderRemoval;
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Prefix for nested environment overrides, e.g. `GEMINI_CHAT_SERVER__PORT`.
const ENV_PREFIX: &str = "GEMINI_CHAT";

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind the server to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the chat API (default)
    Serve,
    /// Chat with a running server from the terminal
    Chat {
        /// Base URL of the chat server
        #[arg(long, env = "CHAT_SERVER_URL")]
        server_url: Option<String>,

        /// How a finished request removes its "Thinking..." placeholder
        #[arg(long, value_enum)]
        placeholder_removal: Option<PlaceholderRemoval>,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
    pub cors_permissive: bool,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tts_model", &self.tts_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub server_url: String,
    pub placeholder_removal: PlaceholderRemoval,
    pub timeout_secs: u64,
}

impl WidgetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Cli {
    /// Parse CLI arguments without exiting the process on failure.
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))
    }

    /// Subcommand to run, `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::parse_from_args(args)?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration.
    ///
    /// Priority: CLI flag > well-known env var > `GEMINI_CHAT_*` env var >
    /// config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.body_limit_bytes", 1024 * 1024)?
            .set_default("server.cors_permissive", false)?
            .set_default("gemini.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("gemini.model", "gemini-2.0-flash")?
            .set_default("gemini.tts_model", "gemini-2.5-flash-preview-tts")?
            .set_default("gemini.timeout_secs", 60)?
            .set_default("widget.server_url", "http://127.0.0.1:5000")?
            .set_default("widget.placeholder_removal", PlaceholderRemoval::default().as_str())?
            .set_default("widget.timeout_secs", 90)?;

        // Explicit file wins over ./config.yaml
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(CWD_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(key) = non_empty_env("GEMINI_API_KEY") {
            builder = builder.set_override("gemini.api_key", key)?;
        }
        if let Some(model) = non_empty_env("GEMINI_MODEL") {
            builder = builder.set_override("gemini.model", model)?;
        }

        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(Command::Chat {
            server_url,
            placeholder_removal,
        }) = &cli.command
        {
            if let Some(url) = server_url {
                builder = builder.set_override("widget.server_url", url.as_str())?;
            }
            if let Some(removal) = placeholder_removal {
                builder = builder.set_override("widget.placeholder_removal", removal.as_str())?;
            }
        }

        builder.build()?.try_deserialize()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validate the Gemini section into settings usable by the client.
pub fn load_gemini_settings(config: &GeminiConfig) -> Result<GeminiSettings, String> {
    let base_url = config.base_url.trim();
    if base_url.is_empty() {
        return Err("gemini.base_url cannot be empty".to_string());
    }

    let model = config.model.trim();
    if model.is_empty() {
        return Err("gemini.model cannot be empty".to_string());
    }

    let tts_model = config.tts_model.trim();
    if tts_model.is_empty() {
        return Err("gemini.tts_model cannot be empty".to_string());
    }

    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "GEMINI_API_KEY environment variable is required".to_string())?;

    Ok(GeminiSettings {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: api_key.to_string(),
        model: model.to_string(),
        tts_model: tts_model.to_string(),
        timeout: Duration::from_secs(config.timeout_secs),
    })
}
