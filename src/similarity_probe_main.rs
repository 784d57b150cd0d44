//! Standalone similarity probe.
//!
//! Embeds a fixed question, queries the Pinecone index directly and prints
//! the top matches as `score: text` lines. Useful for checking what the
//! index actually holds without going through the HTTP service.

use anyhow::Context;

use corpora_api::core::config::ApiKeys;
use corpora_api::llm::{LlmProvider, OpenAiProvider};
use corpora_api::vectordb::{PineconeIndex, VectorIndex, VectorMatch};

const INDEX_NAME: &str = "corpora-chat-1536";
const DIMENSION: usize = 1536;
const METRIC: &str = "cosine";
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const NAMESPACE: &str = "microservices";
const QUERY: &str = "What is this video about?";
const TOP_K: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let keys = ApiKeys::from_env();

    let embedder = OpenAiProvider::new(keys.openai.clone());
    let index = PineconeIndex::new(
        keys.pinecone.clone(),
        keys.pinecone_environment.clone(),
        INDEX_NAME.to_string(),
        DIMENSION,
        METRIC.to_string(),
    );

    let embeddings = embedder
        .embed(&[QUERY.to_string()], EMBEDDING_MODEL)
        .await
        .context("Failed to embed query")?;
    let query_embedding = embeddings
        .into_iter()
        .next()
        .context("No embedding returned for query")?;

    let matches = index
        .query(&query_embedding, TOP_K, NAMESPACE)
        .await
        .context("Similarity query failed")?;

    for m in &matches {
        println!("{}", probe_line(m));
    }

    Ok(())
}

fn probe_line(m: &VectorMatch) -> String {
    format!("{:.2}: {}", m.score, m.text())
}
