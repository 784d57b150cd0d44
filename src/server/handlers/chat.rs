use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub query: String,
    pub namespace: String,
    pub session_id: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChatParams>,
) -> Json<Value> {
    tracing::info!(
        "Query: {}, Session ID: {}, Namespace: {}",
        params.query,
        params.session_id.as_deref().unwrap_or("None"),
        params.namespace
    );

    let response = match state
        .pipeline
        .chat(&params.query, &params.namespace, params.session_id.as_deref())
        .await
    {
        Ok(answer) => answer,
        Err(err) => {
            tracing::error!("Chat failed: {}", err);
            err.user_message()
        }
    };

    Json(json!({ "response": response }))
}
