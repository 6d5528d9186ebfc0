// Unified request/response types for LLM providers
//
// Providers translate these into their own wire format.

use serde::{Deserialize, Serialize};

use crate::conversation::ChatTurn;

/// Unified request format for all LLM providers
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// System prompt, sent ahead of the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Conversation turns, oldest first
    pub messages: Vec<ChatTurn>,

    /// Model name (provider default when empty)
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    /// Create a new request from messages
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            system: None,
            messages,
            model: String::new(), // Will be set by provider
            max_tokens: 1024,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Unified response format from LLM providers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderResponse {
    /// Response ID (provider-specific)
    pub id: String,

    /// Model that generated the response
    pub model: String,

    /// Generated text
    pub text: String,

    /// Why the model stopped generating
    pub stop_reason: Option<String>,

    /// Provider name (e.g., "groq", "openai")
    pub provider: String,
}
