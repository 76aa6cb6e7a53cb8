//! OpenAI-compatible generator implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves a local Ollama server and the
//! hosted OpenAI API via configurable base URLs and factory functions.
//!
//! Uses [`async_openai`] for type-safe request/response handling.

pub mod config;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
};
use secrecy::{ExposeSecret, SecretString};

use groundwise_core::llm::provider::LlmProvider;
use groundwise_types::llm::{
    CompletionRequest, CompletionResponse, GenerationError, MessageRole, StopReason, Usage,
};

use self::config::OpenAiCompatConfig;

/// Unified provider for any OpenAI-compatible API.
///
/// # API Key Security
///
/// Does NOT derive Debug to prevent accidental exposure of the API key
/// stored inside the `async_openai::Client`.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    /// Create a new OpenAI-compatible provider from a configuration.
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            base_url: config.base_url,
            model: config.model,
        }
    }

    /// Create an Ollama provider.
    ///
    /// Uses `http://localhost:11434/v1` as the base URL.
    pub fn ollama(model: &str) -> Self {
        Self::new(config::ollama_defaults(model))
    }

    /// Create an OpenAI provider.
    ///
    /// Uses `https://api.openai.com/v1` as the base URL.
    pub fn openai(api_key: SecretString, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    /// Endpoint requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(system_message(system.clone()));
        }

        for msg in &request.messages {
            let oai_msg = match msg.role {
                MessageRole::System => system_message(msg.content.clone()),
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(oai_msg);
        }

        // Use the model from the request if set, otherwise fall back to config default
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        }
    }

    /// Map an `async_openai::error::OpenAIError` to a [`GenerationError`].
    fn map_error(&self, err: async_openai::error::OpenAIError) -> GenerationError {
        use async_openai::error::OpenAIError;

        match &err {
            OpenAIError::ApiError(api_err) => {
                let code = api_err.code.as_deref().unwrap_or("");
                let error_type = api_err.r#type.as_deref().unwrap_or("");
                let message = api_err.message.to_lowercase();

                if code == "invalid_api_key"
                    || error_type == "authentication_error"
                    || message.contains("incorrect api key")
                    || message.contains("invalid api key")
                {
                    GenerationError::AuthenticationFailed
                } else if code == "model_not_found"
                    || (message.contains("model") && message.contains("not found"))
                {
                    GenerationError::ModelNotFound(self.model.clone())
                } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                    GenerationError::RateLimited {
                        retry_after_ms: None,
                    }
                } else if code == "context_length_exceeded"
                    || message.contains("maximum context length")
                {
                    GenerationError::ContextLengthExceeded {
                        max: 0,
                        requested: 0,
                    }
                } else {
                    GenerationError::Provider {
                        message: err.to_string(),
                    }
                }
            }
            OpenAIError::Reqwest(reqwest_err) => {
                if reqwest_err.is_connect() || reqwest_err.is_timeout() {
                    return GenerationError::Unavailable {
                        endpoint: self.base_url.clone(),
                        message: err.to_string(),
                    };
                }
                match reqwest_err.status().map(|s| s.as_u16()) {
                    Some(401) => GenerationError::AuthenticationFailed,
                    Some(404) => GenerationError::ModelNotFound(self.model.clone()),
                    Some(429) => GenerationError::RateLimited {
                        retry_after_ms: None,
                    },
                    _ => GenerationError::Provider {
                        message: err.to_string(),
                    },
                }
            }
            OpenAIError::InvalidArgument(msg) => GenerationError::InvalidRequest(msg.clone()),
            _ => GenerationError::Provider {
                message: err.to_string(),
            },
        }
    }
}

fn system_message(content: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content),
        name: None,
    })
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, GenerationError> {
        let oai_request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(|e| self.map_error(e))?;

        let first = response.choices.first();
        let content = first
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let stop_reason = match first.and_then(|c| c.finish_reason.as_ref()) {
            Some(FinishReason::Length) => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        tracing::debug!(
            provider = %self.provider_name,
            model = %response.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "completion received"
        );

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwise_types::llm::Message;

    fn request(model: &str, messages: Vec<Message>, system: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            messages,
            system: system.map(str::to_string),
            max_tokens: 512,
            temperature: Some(0.2),
        }
    }

    #[test]
    fn test_ollama_factory() {
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2:3b");
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_openai_factory() {
        let provider = OpenAiCompatibleProvider::openai(SecretString::from("sk-test"), "gpt-4o-mini");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_build_request_messages() {
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let req = request(
            "llama3.2:3b",
            vec![
                Message::user("Hello"),
                Message {
                    role: MessageRole::Assistant,
                    content: "Hi there!".to_string(),
                },
            ],
            Some("Be helpful"),
        );

        let oai_req = provider.build_request(&req);
        assert_eq!(oai_req.model, "llama3.2:3b");
        // 1 system + 2 conversation = 3 messages
        assert_eq!(oai_req.messages.len(), 3);
        assert_eq!(oai_req.max_completion_tokens, Some(512));
        assert_eq!(oai_req.temperature, Some(0.2));
        assert!(oai_req.stream.is_none());
    }

    #[test]
    fn test_build_request_empty_model_uses_default() {
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let oai_req = provider.build_request(&request("", vec![], None));
        assert_eq!(oai_req.model, "llama3.2:3b");
        assert!(oai_req.messages.is_empty());
    }

    #[test]
    fn test_map_error_api_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        };
        let err = provider.map_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, GenerationError::AuthenticationFailed));
    }

    #[test]
    fn test_map_error_ollama_model_not_found() {
        use async_openai::error::{ApiError, OpenAIError};
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let api_err = ApiError {
            message: "model \"llama3.2:3b\" not found, try pulling it first".to_string(),
            r#type: Some("api_error".to_string()),
            param: None,
            code: None,
        };
        let err = provider.map_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, GenerationError::ModelNotFound(ref m) if m == "llama3.2:3b"));
        assert!(err.remediation().unwrap().contains("ollama pull llama3.2:3b"));
    }

    #[test]
    fn test_map_error_rate_limit() {
        use async_openai::error::{ApiError, OpenAIError};
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let api_err = ApiError {
            message: "Rate limit exceeded".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        let err = provider.map_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, GenerationError::RateLimited { .. }));
    }

    #[test]
    fn test_map_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let provider = OpenAiCompatibleProvider::ollama("llama3.2:3b");
        let err = provider.map_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Nothing listens on the discard port.
        let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig {
            provider_name: "ollama".into(),
            base_url: "http://127.0.0.1:9/v1".into(),
            api_key: SecretString::from("ollama"),
            model: "llama3.2:3b".into(),
        });
        let err = provider
            .complete(&request("", vec![Message::user("hi")], None))
            .await
            .unwrap_err();
        match err {
            GenerationError::Unavailable { endpoint, .. } => {
                assert_eq!(endpoint, "http://127.0.0.1:9/v1");
            }
            other => panic!("expected Unavailable, got {other}"),
        }
    }
}
