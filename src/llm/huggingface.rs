use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::PipelineError;

const SERVICE: &str = "huggingface";
const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Serverless Inference API client.
///
/// Text generation models take a single prompt string, so chat messages get
/// flattened before the call. Embeddings go through the feature-extraction
/// pipeline endpoint.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    base_url: String,
    access_token: String,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(access_token: String) -> Self {
        Self {
            base_url: INFERENCE_BASE_URL.to_string(),
            access_token,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError> {
        let url = format!("{}/models/{}", self.base_url, model_id);

        let body = json!({
            "inputs": flatten_prompt(&request.messages),
            "parameters": generation_parameters(&request),
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
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

        parse_generated_text(&payload)
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/pipeline/feature-extraction/{}", self.base_url, model_id);

        let body = json!({ "inputs": inputs });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
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

        let rows = payload.as_array().ok_or_else(|| {
            PipelineError::invalid_response(SERVICE, "feature-extraction output is not an array")
        })?;

        let mut embeddings = Vec::with_capacity(rows.len());
        for row in rows {
            let vals = row.as_array().ok_or_else(|| {
                PipelineError::invalid_response(SERVICE, "embedding row is not an array")
            })?;
            let vec: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vec);
        }

        Ok(embeddings)
    }
}

/// Generation knobs for the text-generation task. `max_tokens` maps to the
/// task's `max_new_tokens`; the echo of the prompt is always disabled.
fn generation_parameters(request: &ChatRequest) -> Value {
    let mut parameters = json!({ "return_full_text": false });
    if let Some(obj) = parameters.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.top_p {
            obj.insert("top_p".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_new_tokens".to_string(), json!(t));
        }
    }
    parameters
}

fn parse_generated_text(payload: &Value) -> Result<String, PipelineError> {
    payload[0]["generated_text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| PipelineError::invalid_response(SERVICE, "missing generated_text"))
}

/// Collapses a message list into one text-generation prompt. A lone user
/// message passes through untouched so prompt templates stay intact.
fn flatten_prompt(messages: &[ChatMessage]) -> String {
    match messages {
        [only] if only.role == "user" => only.content.clone(),
        _ => {
            let mut prompt = String::new();
            for message in messages {
                prompt.push_str(&message.role);
                prompt.push_str(": ");
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
            prompt.push_str("assistant:");
            prompt
        }
    }
}
