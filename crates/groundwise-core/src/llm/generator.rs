//! The single generation call every agent makes.

use std::sync::Arc;

use groundwise_types::llm::{CompletionRequest, GenerationError, Message};

use super::box_provider::BoxLlmProvider;

/// Default completion budget when the caller does not override it.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// `generate(system_instructions, user_prompt) -> text` over any backend.
///
/// Cheap to clone; clones share the underlying provider.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<BoxLlmProvider>,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl Generator {
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Run one completion and return the raw text.
    ///
    /// Backend failures are returned as-is; nothing is retried here.
    #[tracing::instrument(
        name = "generate",
        skip(self, system, user),
        fields(
            provider = %self.provider.name(),
            model = %self.provider.model(),
            prompt_chars = user.len(),
        )
    )]
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages: vec![Message::user(user)],
            system: Some(system.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.provider.complete(&request).await?;
        tracing::debug!(
            output_tokens = response.usage.output_tokens,
            stop_reason = %response.stop_reason,
            "generation complete"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_generate_passes_system_and_user() {
        let provider = ScriptedProvider::new(["hello"]);
        let log = provider.log();
        let generator = Generator::new(BoxLlmProvider::new(provider)).with_temperature(0.2);

        let text = generator.generate("be terse", "say hi").await.unwrap();
        assert_eq!(text, "hello");

        let requests = log.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("be terse"));
        assert_eq!(requests[0].messages[0].content, "say hi");
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(requests[0].max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_generate_surfaces_backend_error() {
        let provider = ScriptedProvider::failing();
        let generator = Generator::new(BoxLlmProvider::new(provider));
        let err = generator.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable { .. }));
    }
}
