use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::PipelineError;

/// A hosted model backend that can answer chat requests and embed text.
///
/// The pipeline holds two instances of this trait: one for completions and
/// one for embeddings. With the default configuration both point at OpenAI,
/// but a mixed setup (e.g. Mixtral chat + sentence-transformers embeddings)
/// only changes wiring, not call sites.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai", "huggingface")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError>;

    /// generate embeddings, one vector per input in order
    async fn embed(&self, inputs: &[String], model_id: &str)
        -> Result<Vec<Vec<f32>>, PipelineError>;
}
