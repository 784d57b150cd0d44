use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddSourceRequest {
    pub source: String,
    pub namespace: String,
}

/// Pipeline failures land in the same 200 payload as successes; clients
/// key off the message text, never the status code.
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddSourceRequest>,
) -> Json<Value> {
    let message = match state
        .pipeline
        .add(&payload.source, &payload.namespace)
        .await
    {
        Ok(_) => format!(
            "Source '{}' added successfully to namespace '{}'.",
            payload.source, payload.namespace
        ),
        Err(err) => {
            tracing::error!("Failed to add source '{}': {}", payload.source, err);
            err.user_message()
        }
    };

    Json(json!({ "message": message }))
}
