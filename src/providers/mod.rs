// LLM inference providers
//
// The router only needs "send a prompt, get text back"; each provider maps
// that onto its own HTTP API.

use anyhow::Result;
use async_trait::async_trait;

pub mod factory;
pub mod openai;
pub mod types;

pub use factory::create_provider;
pub use openai::OpenAIProvider;
pub use types::{ProviderRequest, ProviderResponse};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and get a complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Get the provider name (e.g., "groq", "openai")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
