//! Configuration management for the Financial AI Assistant gateway.
//!
//! The gateway reads an optional configuration file at `~/.finassist/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (including values loaded from a local `.env` file)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `GROQ_API_KEY` → secrets.groq_api_key
//! - `GROQ_BASE_URL` → llm.base_url
//! - `GROQ_MODEL` → llm.model
//! - `FINASSIST_BIND_ADDRESS` → network.bind
//! - `FINASSIST_PORT` → network.port
//! - `FINASSIST_LOG_LEVEL` → observability.log_level
//! - `FINASSIST_LOG_FORMAT` → observability.log_format
//! - `FINASSIST_SESSION_TTL_SECS` → session.idle_ttl_secs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Environment variable holding the upstream credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Instruction prepended to every upstream conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a financial AI assistant. Provide accurate, \
helpful information about stock markets, investments, and financial news. Keep responses \
concise and relevant.";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".finassist"),
        |dirs| dirs.home_dir().join(".finassist"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load a `.env` file from the working directory into the process environment.
///
/// Variables already present in the environment win. Returns the path of the
/// file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0"
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listen port. Default: 8000
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

// ============================================================================
// LLM Configuration
// ============================================================================

/// Upstream chat-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Upper bound on generated tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

// ============================================================================
// Secrets
// ============================================================================

/// Credentials. Never serialized back out when empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Messages retained per session after each turn
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Session key used when the caller does not supply one
    #[serde(default = "default_session_id")]
    pub default_session_id: String,

    /// Evict sessions idle for longer than this. Unset keeps sessions forever.
    #[serde(default)]
    pub idle_ttl_secs: Option<u64>,

    /// How often the eviction sweep runs when `idle_ttl_secs` is set
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            default_session_id: default_session_id(),
            idle_ttl_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_max_messages() -> usize {
    10
}

fn default_session_id() -> String {
    "default".into()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets clamped to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// An environment variable whose value could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredOverride {
    pub var: &'static str,
    pub value: String,
}

impl Config {
    /// Load configuration from the default path, or defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Apply process environment overrides to the configuration.
    ///
    /// Runs before logging is set up, so unparsable values are returned for
    /// the caller to report instead of being logged here.
    pub fn apply_env_overrides(&mut self) -> Vec<IgnoredOverride> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<IgnoredOverride>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        if let Some(key) = lookup(API_KEY_ENV) {
            self.secrets.groq_api_key = Some(key);
        }
        if let Some(url) = lookup("GROQ_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            self.llm.model = model;
        }

        if let Some(bind) = lookup("FINASSIST_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("FINASSIST_PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => ignored.push(IgnoredOverride {
                    var: "FINASSIST_PORT",
                    value: port,
                }),
            }
        }

        if let Some(level) = lookup("FINASSIST_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("FINASSIST_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(ttl) = lookup("FINASSIST_SESSION_TTL_SECS") {
            match ttl.parse() {
                Ok(secs) => self.session.idle_ttl_secs = Some(secs),
                Err(_) => ignored.push(IgnoredOverride {
                    var: "FINASSIST_SESSION_TTL_SECS",
                    value: ttl,
                }),
            }
        }

        ignored
    }

    /// The upstream credential, treating an empty value as absent.
    pub fn groq_api_key(&self) -> Option<&str> {
        self.secrets
            .groq_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
