// Provider factory
//
// Creates the LLM provider named in configuration

use anyhow::{bail, Result};
use std::sync::Arc;

use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::LlmConfig;

/// Create a provider based on the LLM configuration
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let mut provider = match config.provider.as_str() {
        "groq" => OpenAIProvider::new_groq(config.api_key.clone())?,
        "openai" => OpenAIProvider::new_openai(config.api_key.clone())?,
        other => bail!("Unknown provider: {}", other),
    };

    if let Some(model) = &config.model {
        provider = provider.with_model(model.clone());
    }
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    tracing::info!(
        provider = provider.name(),
        model = provider.default_model(),
        "LLM provider configured"
    );

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: "test-key".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_create_groq_provider() {
        let provider = create_provider(&llm("groq")).unwrap();
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.default_model(), "llama3-8b-8192");
    }

    #[test]
    fn test_model_override() {
        let mut config = llm("openai");
        config.model = Some("gpt-4o".to_string());
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o");
    }

    #[test]
    fn test_unknown_provider() {
        assert!(create_provider(&llm("unknown")).is_err());
    }
}
