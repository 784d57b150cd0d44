use std::sync::Arc;

use crate::core::config::{ApiKeys, AppConfig, LlmBackend, VectorDbBackend};
use crate::core::paths::AppPaths;
use crate::history::HistoryStore;
use crate::llm::{HuggingFaceProvider, LlmProvider, OpenAiProvider};
use crate::pipeline::RagPipeline;
use crate::vectordb::{PineconeIndex, VectorIndex};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Holds the loaded configuration, the conversation history store and the
/// assembled retrieval pipeline.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub history: HistoryStore,
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Resolving paths and loading `config.yml`
    /// 2. Opening the history database
    /// 3. Wiring providers and the vector index into the pipeline
    ///
    /// API keys come from the environment as-is. A missing key is not an
    /// initialization error; the affected upstream call fails instead.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = AppConfig::load(&paths).map_err(InitializationError::Config)?;
        let keys = ApiKeys::from_env();

        let history = HistoryStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let llm = build_provider(config.llm.provider, &keys);
        let embedder = build_provider(config.embedder.provider, &keys);

        let index: Arc<dyn VectorIndex> = match config.vectordb.provider {
            VectorDbBackend::Pinecone => Arc::new(PineconeIndex::new(
                keys.pinecone.clone(),
                keys.pinecone_environment.clone(),
                config.vectordb.index_name(),
                config.vectordb.vector_dimension,
                config.vectordb.metric.as_str().to_string(),
            )),
        };

        let pipeline = Arc::new(RagPipeline::new(
            config.clone(),
            llm,
            embedder,
            index,
            history.clone(),
        ));

        Ok(Arc::new(AppState {
            paths,
            config,
            history,
            pipeline,
        }))
    }
}

fn build_provider(backend: LlmBackend, keys: &ApiKeys) -> Arc<dyn LlmProvider> {
    match backend {
        LlmBackend::OpenAi => Arc::new(OpenAiProvider::new(keys.openai.clone())),
        LlmBackend::HuggingFace => Arc::new(HuggingFaceProvider::new(keys.huggingface.clone())),
    }
}
