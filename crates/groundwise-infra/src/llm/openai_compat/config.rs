//! Configuration and per-backend defaults for OpenAI-compatible providers.
//!
//! Each backend that speaks the OpenAI chat completions protocol gets a
//! factory function returning an [`OpenAiCompatConfig`] with the correct
//! base URL.

use secrecy::SecretString;

/// Local Ollama endpoint (OpenAI-compatible surface).
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Hosted OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Ollama ignores the key but the client always sends one.
const OLLAMA_PLACEHOLDER_KEY: &str = "ollama";

/// Configuration for an OpenAI-compatible generator backend.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name ("ollama", "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "http://localhost:11434/v1").
    pub base_url: String,
    /// API key for authentication.
    pub api_key: SecretString,
    /// Model identifier (e.g., "llama3.2:3b", "gpt-4o-mini").
    pub model: String,
}

/// Ollama default configuration.
///
/// Base URL: `http://localhost:11434/v1`
pub fn ollama_defaults(model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "ollama".into(),
        base_url: OLLAMA_BASE_URL.into(),
        api_key: SecretString::from(OLLAMA_PLACEHOLDER_KEY),
        model: model.into(),
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key,
        model: model.into(),
    }
}
