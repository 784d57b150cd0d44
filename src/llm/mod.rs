pub mod huggingface;
pub mod openai;
pub mod provider;
pub mod types;

pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};
