// Error taxonomy and user-friendly error messages
//
// Configuration errors are fatal at startup. Store errors are recovered by
// the caller (escalation or an inline warning). Validation errors surface as
// inline warnings and never create a ticket.

use std::fmt;
use thiserror::Error;

/// Fatal configuration problems detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Carries the environment variable that supplies the setting
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    #[error("Failed to parse config file: {0}")]
    Parse(String),
}

/// Document store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("api key not found: {0}")]
    KeyNotFound(String),

    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored record is malformed: {0}")]
    Malformed(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Errors surfaced by the service layer to HTTP handlers
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or empty required form field
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("admin token missing or invalid")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::Store(StoreError::TicketNotFound(_))
            | ServiceError::Store(StoreError::KeyNotFound(_)) => "not_found",
            ServiceError::Store(StoreError::DuplicateUser(_)) => "conflict",
            ServiceError::Store(_) => "store_error",
            ServiceError::Internal(_) => "api_error",
        }
    }
}

/// Format a missing-setting error with the variable that fixes it
pub fn missing_setting_error(env_var: &str) -> String {
    format!(
        "Configuration Error: {} is not set.\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Export the environment variable:\n\
           \x1b[36mexport {}=...\x1b[0m\n\n\
        2. Or add it to the config file:\n\
           \x1b[36m~/.apiman/config.toml\x1b[0m",
        env_var, env_var
    )
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(error: &str) -> String {
    format!(
        "Failed to parse config file\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat ~/.apiman/config.toml\x1b[0m\n\n\
        2. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Unclosed brackets []\n\
           • Invalid TOML syntax",
        error
    )
}

/// Format a database open error with helpful suggestions
pub fn database_open_error(path: &str, error: impl fmt::Display) -> String {
    format!(
        "Database Connection Failed: {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the parent directory exists and is writable:\n\
           \x1b[36mls -la $(dirname \"{}\")\x1b[0m\n\n\
        2. Point APIMAN_DATABASE_PATH at another location",
        path, error, path
    )
}

/// Translate a startup error into the message shown to the operator
pub fn describe_startup_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ConfigError>() {
        Some(ConfigError::MissingSetting(env_var)) => missing_setting_error(env_var),
        Some(ConfigError::Parse(message)) => config_parse_error(message),
        None => format!("{:#}", error),
    }
}
