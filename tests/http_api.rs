//! End-to-end tests for the HTTP surface, with the upstream services
//! replaced by in-memory doubles.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use corpora_api::core::config::AppConfig;
use corpora_api::core::errors::PipelineError;
use corpora_api::core::paths::AppPaths;
use corpora_api::history::HistoryStore;
use corpora_api::llm::{ChatRequest, LlmProvider};
use corpora_api::pipeline::RagPipeline;
use corpora_api::server::router::router;
use corpora_api::state::AppState;
use corpora_api::vectordb::{VectorIndex, VectorMatch, VectorRecord};

struct MockProvider {
    answer: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: String::new(),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, PipelineError> {
        if self.fail {
            return Err(PipelineError::invalid_response("mock", "llm unavailable"));
        }
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(self.answer.clone())
    }

    async fn embed(
        &self,
        inputs: &[String],
        _model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        if self.fail {
            return Err(PipelineError::invalid_response("mock", "embedder unavailable"));
        }
        Ok(inputs.iter().map(|_| vec![0.5; 4]).collect())
    }
}

#[derive(Default)]
struct MockIndex {
    matches: Vec<VectorMatch>,
    upserted: Mutex<Vec<(String, usize)>>,
    queried: Mutex<Vec<String>>,
}

#[async_trait]
impl VectorIndex for MockIndex {
    async fn upsert(
        &self,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> Result<usize, PipelineError> {
        let count = records.len();
        self.upserted
            .lock()
            .unwrap()
            .push((namespace.to_string(), count));
        Ok(count)
    }

    async fn query(
        &self,
        _embedding: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<VectorMatch>, PipelineError> {
        self.queried.lock().unwrap().push(namespace.to_string());
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}

async fn test_state(
    provider: Arc<MockProvider>,
    index: Arc<MockIndex>,
) -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryStore::new(dir.path().join("history.db"))
        .await
        .unwrap();

    let config = AppConfig::default();
    let pipeline = Arc::new(RagPipeline::new(
        config.clone(),
        provider.clone(),
        provider,
        index,
        history.clone(),
    ));

    let paths = AppPaths {
        project_root: dir.path().to_path_buf(),
        user_data_dir: dir.path().to_path_buf(),
        log_dir: dir.path().join("logs"),
        db_path: dir.path().join("history.db"),
    };

    let state = Arc::new(AppState {
        paths: Arc::new(paths),
        config,
        history,
        pipeline,
    });

    (dir, state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn add_request(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn add_returns_success_message() {
    let (_dir, state) = test_state(MockProvider::new("unused"), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(add_request(
            json!({ "source": "Some plain text to ingest.", "namespace": "default" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Source 'Some plain text to ingest.' added successfully to namespace 'default'."
    );
}

#[tokio::test]
async fn add_honours_the_requested_namespace() {
    let index = Arc::new(MockIndex::default());
    let (_dir, state) = test_state(MockProvider::new("unused"), index.clone()).await;
    let app = router(state);

    let response = app
        .oneshot(add_request(
            json!({ "source": "note", "namespace": "teamdocs" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .ends_with("added successfully to namespace 'teamdocs'."));

    let upserted = index.upserted.lock().unwrap();
    assert_eq!(upserted.len(), 1);
    assert_eq!(upserted[0].0, "teamdocs");
}

#[tokio::test]
async fn add_failure_still_answers_200_with_support_footer() {
    let (_dir, state) = test_state(MockProvider::failing(), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(add_request(
            json!({ "source": "whatever", "namespace": "default" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("An error occurred: Error message: "));
    assert!(message.contains("embedder unavailable"));
    assert!(message.contains("https://corpora.chat/slack"));
    assert!(message.contains("https://corpora.chat/discord"));
}

#[tokio::test]
async fn chat_returns_the_model_answer() {
    let index = Arc::new(MockIndex {
        matches: vec![VectorMatch {
            id: "m1".to_string(),
            score: 0.9,
            metadata: json!({ "text": "Containers everywhere.", "source": "infra.md" }),
        }],
        ..MockIndex::default()
    });
    let (_dir, state) = test_state(MockProvider::new("It is about containers."), index.clone()).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=What%20is%20this%20about%3F&namespace=microservices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "It is about containers.");
    assert_eq!(*index.queried.lock().unwrap(), vec!["microservices"]);
}

#[tokio::test]
async fn chat_failure_still_answers_200_with_support_footer() {
    let (_dir, state) = test_state(MockProvider::failing(), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=hello&namespace=default")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let message = body["response"].as_str().unwrap();
    assert!(message.starts_with("An error occurred: Error message: "));
    assert!(message.contains("https://corpora.chat/slack"));
}

#[tokio::test]
async fn chat_with_session_id_reuses_history() {
    let provider = MockProvider::new("the answer");
    let (_dir, state) = test_state(provider.clone(), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=first%20question&namespace=default&session_id=s1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=second%20question&namespace=default&session_id=s1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("History:"));
    assert!(prompts[1].contains("History:"));
    assert!(prompts[1].contains("human: first question"));
    assert!(prompts[1].contains("ai: the answer"));
}

#[tokio::test]
async fn chat_with_an_empty_session_id_stays_stateless() {
    let provider = MockProvider::new("ok");
    let (_dir, state) = test_state(provider.clone(), Arc::new(MockIndex::default())).await;
    let app = router(state.clone());

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=first&namespace=default&session_id=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=second&namespace=default&session_id=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    // Nothing is stored under the empty-string key and nothing is replayed.
    assert_eq!(state.history.count_messages("").await.unwrap(), 0);
    let prompts = provider.prompts.lock().unwrap();
    assert!(!prompts[1].contains("History:"));
}

#[tokio::test]
async fn root_redirects_to_docs() {
    let (_dir, state) = test_state(MockProvider::new("unused"), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/docs"
    );
}

#[tokio::test]
async fn docs_page_is_served() {
    let (_dir, state) = test_state(MockProvider::new("unused"), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Corpora API"));
    assert!(html.contains("/api/v1/add"));
    assert!(html.contains("/api/v1/chat"));
}

#[tokio::test]
async fn chat_without_query_keeps_the_framework_rejection() {
    let (_dir, state) = test_state(MockProvider::new("unused"), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Extractor rejections are not pipeline failures; they keep their
    // native status codes.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_namespace_is_rejected_before_the_pipeline() {
    let index = Arc::new(MockIndex::default());
    let (_dir, state) = test_state(MockProvider::new("unused"), index.clone()).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?query=hello")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(index.queried.lock().unwrap().is_empty());
}

#[tokio::test]
async fn add_without_namespace_is_rejected_before_the_pipeline() {
    let index = Arc::new(MockIndex::default());
    let (_dir, state) = test_state(MockProvider::new("unused"), index.clone()).await;
    let app = router(state);

    let response = app
        .oneshot(add_request(json!({ "source": "note" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(index.upserted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn add_without_json_content_type_keeps_the_framework_rejection() {
    let (_dir, state) = test_state(MockProvider::new("unused"), Arc::new(MockIndex::default())).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/add")
                .body(Body::from("source=plain"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}
