//! VectorIndex trait — abstract interface over vector database backends.
//!
//! The primary implementation is `PineconeIndex` in the `pinecone` module;
//! tests swap in an in-memory double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::PipelineError;

pub mod pinecone;

pub use pinecone::PineconeIndex;

/// A vector with its payload, ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

/// One similarity match returned from a query, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Value,
}

impl VectorMatch {
    pub fn text(&self) -> &str {
        self.metadata
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// Abstract trait for vector database backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records in one namespace. Returns the number
    /// of vectors written.
    async fn upsert(
        &self,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<usize, PipelineError>;

    /// Nearest-neighbour search scoped to one namespace.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<VectorMatch>, PipelineError>;
}
