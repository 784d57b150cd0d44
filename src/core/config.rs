use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

/// Which hosted backend serves chat completions or embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    OpenAi,
    HuggingFace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_id")]
    pub id: String,
    #[serde(default)]
    pub collect_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_llm_backend")]
    pub provider: LlmBackend,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderSection {
    #[serde(default = "default_llm_backend")]
    pub provider: LlmBackend,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

/// Which store holds the vectors. Only Pinecone is wired in, but the tag
/// is a closed set so a typo in `config.yml` fails loudly instead of being
/// carried along as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDbBackend {
    Pinecone,
}

/// Similarity metric an index is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    Cosine,
    Euclidean,
    DotProduct,
}

impl SimilarityMetric {
    /// The tag as the service spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbSection {
    #[serde(default = "default_vectordb_backend")]
    pub provider: VectorDbBackend,
    #[serde(default = "default_metric")]
    pub metric: SimilarityMetric,
    #[serde(default = "default_dimension")]
    pub vector_dimension: usize,
    #[serde(default = "default_collection")]
    pub collection_name: String,
}

impl VectorDbSection {
    /// The physical index name carries the dimension as a suffix so that
    /// changing the embedder never writes mixed-width vectors into one index.
    pub fn index_name(&self) -> String {
        format!("{}-{}", self.collection_name, self.vector_dimension)
    }
}

/// Typed view of `config.yml`.
///
/// Every field has a default, so an absent or empty file yields a working
/// OpenAI + Pinecone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub embedder: EmbedderSection,
    #[serde(default)]
    pub vectordb: VectorDbSection,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            id: default_app_id(),
            collect_metrics: false,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_llm_backend(),
            model: default_llm_model(),
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }
}

impl Default for EmbedderSection {
    fn default() -> Self {
        Self {
            provider: default_llm_backend(),
            model: default_embedding_model(),
        }
    }
}

impl Default for VectorDbSection {
    fn default() -> Self {
        Self {
            provider: default_vectordb_backend(),
            metric: default_metric(),
            vector_dimension: default_dimension(),
            collection_name: default_collection(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            embedder: EmbedderSection::default(),
            vectordb: VectorDbSection::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the first `config.yml` found.
    ///
    /// Lookup order: `CORPORA_CONFIG_PATH`, then the user data directory,
    /// then the project root. A missing file is not an error.
    pub fn load(paths: &AppPaths) -> anyhow::Result<Self> {
        match config_path(paths) {
            Some(path) => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Self::from_yaml(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// The ready-made open-weights profile: Mixtral for chat, MPNet for
    /// embeddings, both served by the Hugging Face inference API.
    pub fn hugging_face() -> Self {
        Self {
            llm: LlmSection {
                provider: LlmBackend::HuggingFace,
                model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
                temperature: Some(0.1),
                top_p: Some(0.1),
                max_tokens: Some(250),
            },
            embedder: EmbedderSection {
                provider: LlmBackend::HuggingFace,
                model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            },
            ..Self::default()
        }
    }
}

fn config_path(paths: &AppPaths) -> Option<PathBuf> {
    if let Ok(path) = env::var("CORPORA_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }

    let user_config = paths.user_data_dir.join("config.yml");
    if user_config.exists() {
        return Some(user_config);
    }

    let project_config = paths.project_root.join("config.yml");
    if project_config.exists() {
        return Some(project_config);
    }

    None
}

/// API credentials pulled from the environment at startup.
///
/// Values are passed through untouched. A missing variable becomes an empty
/// string, which the upstream service rejects on first use; that rejection
/// flows back through the normal error path.
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub openai: String,
    pub huggingface: String,
    pub pinecone: String,
    pub pinecone_environment: String,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            openai: env::var("OPENAI_API_KEY").unwrap_or_default(),
            huggingface: env::var("HUGGINGFACE_ACCESS_TOKEN").unwrap_or_default(),
            pinecone: env::var("PINECONE_API_KEY").unwrap_or_default(),
            pinecone_environment: env::var("PINECONE_ENV").unwrap_or_default(),
        }
    }
}

fn default_app_id() -> String {
    "corpora-api".to_string()
}

fn default_llm_backend() -> LlmBackend {
    LlmBackend::OpenAi
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo-1106".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_vectordb_backend() -> VectorDbBackend {
    VectorDbBackend::Pinecone
}

fn default_metric() -> SimilarityMetric {
    SimilarityMetric::Cosine
}

fn default_dimension() -> usize {
    1536
}

fn default_collection() -> String {
    "corpora-chat".to_string()
}
