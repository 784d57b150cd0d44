//! Retrieval pipeline facade.
//!
//! One entry point for both write and read paths:
//! - `add` resolves a source, chunks it, embeds the chunks and upserts
//!   them into the vector index under a namespace.
//! - `chat` embeds the query, retrieves the closest chunks, assembles a
//!   prompt (with optional session history) and asks the completion model.

use std::sync::Arc;

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::core::config::AppConfig;
use crate::core::errors::PipelineError;
use crate::history::{HistoryStore, ROLE_AI, ROLE_HUMAN};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::vectordb::{VectorIndex, VectorRecord};

pub mod chunker;
pub mod context;
pub mod loader;

pub use chunker::{Chunk, Chunker, ChunkerConfig};
pub use context::{ContextBuilder, ContextConfig};
pub use loader::{SourceDocument, SourceKind, SourceLoader};

/// How many past messages get replayed into the prompt.
const HISTORY_WINDOW: i64 = 10;

pub struct RagPipeline {
    config: AppConfig,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    history: HistoryStore,
    loader: SourceLoader,
    chunker: Chunker,
    context: ContextBuilder,
}

impl RagPipeline {
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
        history: HistoryStore,
    ) -> Self {
        Self {
            config,
            llm,
            embedder,
            index,
            history,
            loader: SourceLoader::new(),
            chunker: Chunker::new(ChunkerConfig::default()),
            context: ContextBuilder::new(ContextConfig::default()),
        }
    }

    /// Ingests one source into a namespace and returns the number of
    /// vectors written.
    pub async fn add(&self, source: &str, namespace: &str) -> Result<usize, PipelineError> {
        let document = self.loader.resolve(source).await?;
        let chunks = self.chunker.split(&document.text, source);

        if chunks.is_empty() {
            tracing::warn!("Source '{}' produced no chunks", source);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed(&texts, &self.config.embedder.model)
            .await?;

        if embeddings.len() != chunks.len() {
            return Err(PipelineError::invalid_response(
                "embedder",
                format!(
                    "got {} embeddings for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
            ));
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: chunk_id(&chunk.text, source),
                values,
                metadata: json!({
                    "text": chunk.text,
                    "source": source,
                    "chunk_index": chunk.chunk_index,
                    "app_id": self.config.app.id,
                }),
            })
            .collect();

        let written = self.index.upsert(records, namespace).await?;
        tracing::info!(
            "Upserted {} vectors from '{}' into namespace '{}'",
            written,
            source,
            namespace
        );

        if self.config.app.collect_metrics {
            tracing::info!(
                target: "usage",
                app_id = %self.config.app.id,
                event = "add",
                vectors = written
            );
        }

        Ok(written)
    }

    /// Answers one query against a namespace. With a session id the last
    /// turns are replayed into the prompt and the new exchange is stored;
    /// without one the turn is stateless. An empty session id counts as
    /// absent.
    pub async fn chat(
        &self,
        query: &str,
        namespace: &str,
        session_id: Option<&str>,
    ) -> Result<String, PipelineError> {
        // Would otherwise pool unrelated turns under the "" key.
        let session_id = session_id.filter(|sid| !sid.is_empty());

        let embeddings = self
            .embedder
            .embed(&[query.to_string()], &self.config.embedder.model)
            .await?;
        let query_embedding = embeddings.into_iter().next().ok_or_else(|| {
            PipelineError::invalid_response("embedder", "no embedding returned for query")
        })?;

        let matches = self
            .index
            .query(&query_embedding, self.context.config().top_k, namespace)
            .await?;
        let context = self.context.format_matches(&matches);

        let history = match session_id {
            Some(sid) => self.history.get_history(sid, HISTORY_WINDOW).await?,
            None => Vec::new(),
        };

        let prompt = self.context.build_prompt(&context, &history, query);
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.config.llm.temperature,
            top_p: self.config.llm.top_p,
            max_tokens: self.config.llm.max_tokens,
        };

        let answer = self.llm.chat(request, &self.config.llm.model).await?;

        if let Some(sid) = session_id {
            self.history.add_message(sid, ROLE_HUMAN, query).await?;
            self.history.add_message(sid, ROLE_AI, &answer).await?;
        }

        if self.config.app.collect_metrics {
            tracing::info!(
                target: "usage",
                app_id = %self.config.app.id,
                event = "chat",
                retrieved = matches.len()
            );
        }

        Ok(answer)
    }
}

/// Content-addressed vector id, stable across re-ingestion of the same
/// source so upserts overwrite instead of duplicating.
fn chunk_id(text: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}
