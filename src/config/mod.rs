// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{load_config, resolve, FileConfig};
pub use settings::{Config, LlmConfig, ServerConfig, TwilioConfig};
