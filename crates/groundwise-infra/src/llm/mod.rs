//! Generator backend implementations.
//!
//! Contains the OpenAI-compatible [`LlmProvider`] adapter and a factory
//! ([`create_provider`]) that builds the configured backend from
//! [`GeneratorConfig`], plus a connection probe used by `groundwise check`.
//!
//! [`LlmProvider`]: groundwise_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;

use groundwise_core::llm::box_provider::BoxLlmProvider;
use groundwise_core::llm::generator::Generator;
use groundwise_types::config::{GeneratorConfig, ProviderKind};
use groundwise_types::llm::{CompletionRequest, GenerationError, Message};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{OpenAiCompatConfig, ollama_defaults, openai_defaults};

/// Read the API key named by `[generator].api_key_env`.
fn api_key_from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

/// Create a [`BoxLlmProvider`] from a [`GeneratorConfig`].
///
/// # Errors
///
/// Returns [`GenerationError::AuthenticationFailed`] when the OpenAI backend
/// is selected but its API key variable is unset.
pub fn create_provider(config: &GeneratorConfig) -> Result<BoxLlmProvider, GenerationError> {
    let mut oai_config: OpenAiCompatConfig = match config.provider {
        ProviderKind::Ollama => ollama_defaults(&config.model),
        ProviderKind::OpenAi => {
            let key = api_key_from_env(&config.api_key_env)
                .ok_or(GenerationError::AuthenticationFailed)?;
            openai_defaults(key, &config.model)
        }
    };
    if let Some(base_url) = config.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        oai_config.base_url = base_url.trim_end_matches('/').to_string();
    }

    tracing::debug!(
        provider = %oai_config.provider_name,
        base_url = %oai_config.base_url,
        model = %oai_config.model,
        "generator configured"
    );
    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)))
}

/// Build the shared [`Generator`] with the configured sampling settings.
pub fn create_generator(config: &GeneratorConfig) -> Result<Generator, GenerationError> {
    let provider = create_provider(config)?;
    Ok(Generator::new(provider)
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature))
}

/// Test provider connectivity by sending a minimal completion request.
///
/// # Errors
///
/// Returns the generation error if the provider fails to respond.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), GenerationError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
    };
    provider.complete(&request).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_ollama_default() {
        let provider = create_provider(&GeneratorConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2:3b");
    }

    #[test]
    fn test_create_provider_openai_missing_key() {
        let config = GeneratorConfig {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "GROUNDWISE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..GeneratorConfig::default()
        };
        match create_provider(&config) {
            Err(GenerationError::AuthenticationFailed) => {}
            Err(other) => panic!("Expected AuthenticationFailed, got: {other}"),
            Ok(_) => panic!("Expected error but got Ok"),
        }
    }

    #[test]
    fn test_create_provider_openai_with_key() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("GROUNDWISE_TEST_OPENAI_KEY", "sk-test");
        }
        let config = GeneratorConfig {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "GROUNDWISE_TEST_OPENAI_KEY".to_string(),
            ..GeneratorConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        unsafe {
            std::env::remove_var("GROUNDWISE_TEST_OPENAI_KEY");
        }
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_create_generator_carries_model() {
        let config = GeneratorConfig {
            model: "qwen2.5:7b".to_string(),
            base_url: Some("http://gpu-box:11434/v1/".to_string()),
            ..GeneratorConfig::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.provider_name(), "ollama");
        assert_eq!(generator.model(), "qwen2.5:7b");
    }
}
