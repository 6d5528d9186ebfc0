// Configuration loader
// Reads ~/.apiman/config.toml when present, then applies environment overrides

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use super::settings::{Config, LlmConfig, ServerConfig, TwilioConfig};
use crate::errors::ConfigError;

/// On-disk config file layout. Every field is optional so that a partial
/// file can be completed from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub support_phone_number: Option<String>,
    #[serde(default)]
    pub twilio: Option<PartialTwilio>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub history_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialTwilio {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

/// Load configuration from the APIMAN config file and the process environment
pub fn load_config() -> Result<Config> {
    let file = read_config_file()?;
    resolve(file, |key| std::env::var(key).ok())
}

fn read_config_file() -> Result<Option<FileConfig>> {
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return Ok(None),
    };
    let config_path = home.join(".apiman/config.toml");

    if !config_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let parsed = toml::from_str::<FileConfig>(&contents)
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(Some(parsed))
}

/// Merge the file config with environment lookups and validate required settings.
///
/// Missing LLM key, support number or database location is fatal. Partial
/// Twilio credentials only disable notifications.
pub fn resolve<F>(file: Option<FileConfig>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let file = file.unwrap_or_default();
    let get = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let mut llm = file.llm.unwrap_or_default();
    if let Some(key) = get("GROQ_API_KEY") {
        llm.api_key = key;
    }
    if let Some(model) = get("APIMAN_LLM_MODEL") {
        llm.model = Some(model);
    }
    if let Some(base_url) = get("APIMAN_LLM_BASE_URL") {
        llm.base_url = Some(base_url);
    }

    let support_phone_number = get("SUPPORT_PHONE_NUMBER")
        .or(file.support_phone_number)
        .ok_or(ConfigError::MissingSetting("SUPPORT_PHONE_NUMBER"))?;

    if llm.api_key.trim().is_empty() {
        return Err(ConfigError::MissingSetting("GROQ_API_KEY").into());
    }

    let database_path = get("APIMAN_DATABASE_PATH")
        .map(PathBuf::from)
        .or(file.database_path)
        .ok_or(ConfigError::MissingSetting("APIMAN_DATABASE_PATH"))?;

    let partial = file.twilio.unwrap_or_default();
    let account_sid = get("TWILIO_ACCOUNT_SID").or(partial.account_sid);
    let auth_token = get("TWILIO_AUTH_TOKEN").or(partial.auth_token);
    let from_number = get("TWILIO_NUMBER").or(partial.from_number);

    let twilio = match (account_sid, auth_token, from_number) {
        (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
            account_sid,
            auth_token,
            from_number,
        }),
        _ => {
            tracing::warn!("Twilio credentials not fully configured; ticket notifications disabled");
            None
        }
    };

    let mut server = file.server.unwrap_or_default();
    if let Some(token) = get("APIMAN_ADMIN_TOKEN") {
        server.admin_token = Some(token);
    }
    if let Some(bind) = get("APIMAN_BIND") {
        server.bind_address = bind;
    }

    let mut config = Config::new(llm, database_path, support_phone_number);
    config.twilio = twilio;
    config.server = server;
    if let Some(window) = file.history_window {
        config.history_window = window;
    }

    Ok(config)
}
