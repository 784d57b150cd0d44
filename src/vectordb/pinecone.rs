use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{VectorIndex, VectorMatch, VectorRecord};
use crate::core::errors::PipelineError;

const SERVICE: &str = "pinecone";
/// Upsert payload ceiling imposed by the data plane.
const UPSERT_BATCH: usize = 100;

/// Pinecone index client.
///
/// The data-plane host is looked up from the controller on first use and
/// cached for the lifetime of the process. If the index does not exist yet
/// it is created with the configured dimension and metric.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    environment: String,
    index_name: String,
    dimension: usize,
    metric: String,
    host: RwLock<Option<String>>,
}

impl PineconeIndex {
    pub fn new(
        api_key: String,
        environment: String,
        index_name: String,
        dimension: usize,
        metric: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            environment,
            index_name,
            dimension,
            metric,
            host: RwLock::new(None),
        }
    }

    fn controller_url(&self) -> String {
        format!("https://controller.{}.pinecone.io", self.environment)
    }

    /// Looks the index up on the controller. `Ok(None)` means not found.
    async fn describe_host(&self) -> Result<Option<String>, PipelineError> {
        let url = format!(
            "{}/databases/{}",
            self.controller_url(),
            urlencoding::encode(&self.index_name)
        );

        let res = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        if res.status().as_u16() == 404 {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::api(SERVICE, status, text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        match payload["status"]["host"].as_str() {
            Some(host) if !host.is_empty() => Ok(Some(host.to_string())),
            _ => Err(PipelineError::invalid_response(
                SERVICE,
                "index description has no host",
            )),
        }
    }

    async fn create_index(&self) -> Result<(), PipelineError> {
        let url = format!("{}/databases", self.controller_url());
        let body = json!({
            "name": self.index_name,
            "dimension": self.dimension,
            "metric": self.metric,
        });

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        // 409 means another writer created it first, which is just as good.
        if res.status().is_success() || res.status().as_u16() == 409 {
            Ok(())
        } else {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            Err(PipelineError::api(SERVICE, status, text))
        }
    }

    async fn host(&self) -> Result<String, PipelineError> {
        if let Some(host) = self.host.read().await.clone() {
            return Ok(host);
        }

        let mut guard = self.host.write().await;
        if let Some(host) = guard.clone() {
            return Ok(host);
        }

        let host = match self.describe_host().await? {
            Some(host) => host,
            None => {
                tracing::info!("Index '{}' not found, creating it", self.index_name);
                self.create_index().await?;
                self.describe_host().await?.ok_or_else(|| {
                    PipelineError::invalid_response(SERVICE, "index missing after creation")
                })?
            }
        };

        *guard = Some(host.clone());
        Ok(host)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<usize, PipelineError> {
        if records.is_empty() {
            return Ok(0);
        }

        let host = self.host().await?;
        let url = format!("https://{}/vectors/upsert", host);

        let mut written = 0usize;
        for batch in records.chunks(UPSERT_BATCH) {
            let body = json!({
                "vectors": batch,
                "namespace": namespace,
            });

            let res = self
                .client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| PipelineError::transport(SERVICE, e))?;

            if !res.status().is_success() {
                let status = res.status().as_u16();
                let text = res.text().await.unwrap_or_default();
                return Err(PipelineError::api(SERVICE, status, text));
            }

            let payload: Value = res
                .json()
                .await
                .map_err(|e| PipelineError::transport(SERVICE, e))?;
            written += payload["upsertedCount"]
                .as_u64()
                .unwrap_or(batch.len() as u64) as usize;
        }

        Ok(written)
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<VectorMatch>, PipelineError> {
        let host = self.host().await?;
        let url = format!("https://{}/query", host);

        let body = json!({
            "vector": embedding,
            "topK": top_k,
            "includeMetadata": true,
            "namespace": namespace,
        });

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::api(SERVICE, status, text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| PipelineError::transport(SERVICE, e))?;

        Ok(parse_matches(&payload))
    }
}

/// Lenient mapping of a query response body, in service order. Missing
/// fields fall back instead of failing the whole request.
fn parse_matches(payload: &Value) -> Vec<VectorMatch> {
    let mut matches = Vec::new();
    if let Some(rows) = payload["matches"].as_array() {
        for row in rows {
            matches.push(VectorMatch {
                id: row["id"].as_str().unwrap_or_default().to_string(),
                score: row["score"].as_f64().unwrap_or(0.0) as f32,
                metadata: row.get("metadata").cloned().unwrap_or(Value::Null),
            });
        }
    }
    matches
}
