use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::PipelineError;

const SERVICE: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = chat_body(&request, model_id);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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

        parse_chat_content(&payload)
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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

        parse_embeddings(&payload)
    }
}

fn chat_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.top_p {
            obj.insert("top_p".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }

    body
}

fn parse_chat_content(payload: &Value) -> Result<String, PipelineError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| PipelineError::invalid_response(SERVICE, "missing message content"))
}

fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| PipelineError::invalid_response(SERVICE, "missing embedding data"))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let vals = item["embedding"].as_array().ok_or_else(|| {
            PipelineError::invalid_response(SERVICE, "embedding entry is not an array")
        })?;
        let vec: Vec<f32> = vals
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        embeddings.push(vec);
    }

    Ok(embeddings)
}
