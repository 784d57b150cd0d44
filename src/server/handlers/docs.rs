use axum::response::{Html, Redirect};

/// The root path forwards to the API reference, mirroring what frameworks
/// with built-in docs do.
pub async fn root() -> Redirect {
    Redirect::temporary("/docs")
}

pub async fn docs_page() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

const DOCS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Corpora API</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; color: #1c1c1c; }
    code, pre { background: #f4f4f4; border-radius: 4px; padding: 0.1rem 0.3rem; }
    pre { padding: 0.7rem; overflow-x: auto; }
    h2 { margin-top: 2rem; }
    .method { font-weight: bold; color: #205ea6; }
  </style>
</head>
<body>
  <h1>Corpora API</h1>
  <p>Ingest sources into a vector index and chat over them. Every response
  is a JSON object with HTTP status 200; failures are reported inside the
  payload text.</p>

  <h2><span class="method">POST</span> /api/v1/add</h2>
  <p>Adds a source (URL, file path or raw text) to a namespace.</p>
  <pre>curl -X POST http://localhost:8000/api/v1/add \
  -H 'Content-Type: application/json' \
  -d '{"source": "https://example.com/article", "namespace": "default"}'</pre>
  <p>Response: <code>{"message": "Source '...' added successfully to namespace '...'."}</code></p>

  <h2><span class="method">GET</span> /api/v1/chat</h2>
  <p>Answers a query against a namespace. Pass a <code>session_id</code> to
  keep conversation history across turns.</p>
  <pre>curl 'http://localhost:8000/api/v1/chat?query=What%20is%20this%20about%3F&amp;session_id=abc&amp;namespace=default'</pre>
  <p>Response: <code>{"response": "..."}</code></p>
</body>
</html>
"#;
