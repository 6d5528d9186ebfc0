// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// LLM provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name ("groq" or "openai")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key for the provider
    #[serde(default)]
    pub api_key: String,

    /// Model override (provider default when absent)
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override, e.g. for a self-hosted gateway
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub temperature: f32,
}

fn default_provider() -> String {
    "groq".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            model: None,
            base_url: None,
            temperature: 0.0,
        }
    }
}

/// Twilio WhatsApp credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, without the `whatsapp:` prefix
    pub from_number: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of concurrent chat sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Session timeout in minutes
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u64,
    /// Token required on operator routes; open when unset
    #[serde(default)]
    pub admin_token: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_sessions() -> usize {
    100
}

fn default_session_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_sessions: default_max_sessions(),
            session_timeout_minutes: default_session_timeout(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    /// SQLite document store location
    pub database_path: PathBuf,

    /// Support line that receives ticket notifications
    pub support_phone_number: String,

    /// None disables notifications
    pub twilio: Option<TwilioConfig>,

    pub server: ServerConfig,

    /// Number of history turns forwarded to the LLM
    pub history_window: usize,
}

impl Config {
    pub fn new(llm: LlmConfig, database_path: PathBuf, support_phone_number: String) -> Self {
        Self {
            llm,
            database_path,
            support_phone_number,
            twilio: None,
            server: ServerConfig::default(),
            history_window: 5,
        }
    }
}
