//! LlmProvider trait definition.
//!
//! This is the core abstraction every generator backend implements.
//! Uses RPITIT for `complete`; see [`super::box_provider`] for the
//! object-safe wrapper.

use groundwise_types::llm::{CompletionRequest, CompletionResponse, GenerationError};

/// Trait for generator backends (Ollama, OpenAI, test doubles).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in groundwise-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, GenerationError>> + Send;
}
