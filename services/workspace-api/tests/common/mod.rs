#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_test::{TestRequest, TestResponse, TestServer};
use serde_json::{json, Value};
use shared::{AIClient, AiConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use workspace_api::{create_app, AppState, Assistant, GoogleClient, GoogleEndpoints};

pub const TOKEN: &str = "test-access-token";

/// One request as the mock Google server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_deref().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

#[derive(Clone)]
enum MockBody {
    Json(Value),
    Bytes(&'static str, Vec<u8>),
}

#[derive(Clone)]
struct MockRoute {
    method: Method,
    path: String,
    query_contains: Option<String>,
    status: StatusCode,
    body: MockBody,
}

#[derive(Default)]
struct MockGoogleState {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Programmable stand-in for every Google API, served from one host with
/// the same path prefixes Google uses.
pub struct MockGoogle {
    pub base_url: String,
    state: Arc<MockGoogleState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockGoogle {
    pub async fn start() -> Self {
        let state = Arc::new(MockGoogleState::default());

        let app = Router::new()
            .fallback(handle_google)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            _handle: handle,
        }
    }

    pub fn on(&self, method: Method, path: &str, status: StatusCode, body: Value) -> &Self {
        self.state.routes.lock().unwrap().push(MockRoute {
            method,
            path: path.to_string(),
            query_contains: None,
            status,
            body: MockBody::Json(body),
        });
        self
    }

    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.on(method, path, StatusCode::OK, body)
    }

    /// Serves raw bytes for requests whose query string contains `query_contains`.
    /// Register before a JSON route on the same path.
    pub fn bytes(
        &self,
        method: Method,
        path: &str,
        query_contains: &str,
        content_type: &'static str,
        body: &[u8],
    ) -> &Self {
        self.state.routes.lock().unwrap().push(MockRoute {
            method,
            path: path.to_string(),
            query_contains: Some(query_contains.to_string()),
            status: StatusCode::OK,
            body: MockBody::Bytes(content_type, body.to_vec()),
        });
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn single_request(&self, method: Method, path: &str) -> RecordedRequest {
        let matching = self.requests_to(method.clone(), path);
        assert_eq!(
            matching.len(),
            1,
            "expected exactly one {} {} but saw {:?}",
            method,
            path,
            self.requests()
                .iter()
                .map(|r| format!("{} {}", r.method, r.path))
                .collect::<Vec<_>>()
        );
        matching.into_iter().next().unwrap()
    }
}

async fn handle_google(
    State(state): State<Arc<MockGoogleState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body,
    });

    let route = state
        .routes
        .lock()
        .unwrap()
        .iter()
        .find(|r| {
            r.method == method
                && r.path == uri.path()
                && r.query_contains
                    .as_deref()
                    .map_or(true, |needle| uri.query().unwrap_or_default().contains(needle))
        })
        .cloned();

    match route {
        Some(MockRoute {
            status,
            body: MockBody::Json(body),
            ..
        }) => (status, Json(body)).into_response(),
        Some(MockRoute {
            status,
            body: MockBody::Bytes(content_type, bytes),
            ..
        }) => (status, [(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "message": format!("no mock for {} {}", method, uri.path()) } })),
        )
            .into_response(),
    }
}

#[derive(Default)]
struct MockLlmState {
    rules: Mutex<Vec<(String, String)>>,
    fallback: Mutex<String>,
    prompts: Mutex<Vec<Value>>,
}

/// OpenAI-compatible chat endpoint answering by substring match on the
/// request's messages.
pub struct MockLlm {
    pub base_url: String,
    state: Arc<MockLlmState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockLlm {
    pub async fn start() -> Self {
        let state = Arc::new(MockLlmState::default());

        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            _handle: handle,
        }
    }

    /// Answers with `answer` whenever the system or user message contains `needle`.
    pub fn answer_when(&self, needle: &str, answer: &str) -> &Self {
        self.state
            .rules
            .lock()
            .unwrap()
            .push((needle.to_string(), answer.to_string()));
        self
    }

    pub fn answer(&self, answer: &str) -> &Self {
        *self.state.fallback.lock().unwrap() = answer.to_string();
        self
    }

    pub fn requests(&self) -> Vec<Value> {
        self.state.prompts.lock().unwrap().clone()
    }
}

async fn chat_completions(
    State(state): State<Arc<MockLlmState>>,
    Json(request): Json<Value>,
) -> Json<Value> {
    let text = request["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["content"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    state.prompts.lock().unwrap().push(request);

    let answer = state
        .rules
        .lock()
        .unwrap()
        .iter()
        .find(|(needle, _)| text.contains(needle.as_str()))
        .map(|(_, answer)| answer.clone())
        .unwrap_or_else(|| state.fallback.lock().unwrap().clone());

    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": answer } }]
    }))
}

pub struct TestContext {
    pub server: TestServer,
    pub google: MockGoogle,
    pub llm: MockLlm,
}

impl TestContext {
    pub async fn new() -> Self {
        shared::telemetry::install_trace_propagator();
        let google = MockGoogle::start().await;
        let llm = MockLlm::start().await;

        let ai_client = AIClient::new(&AiConfig {
            api_base_url: llm.base_url.clone(),
            api_key: "test-ai-key".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
        })
        .unwrap();

        let google_client = GoogleClient::new(
            GoogleEndpoints::with_host(&google.base_url),
            Duration::from_secs(5),
        )
        .unwrap();

        let state = AppState {
            google: google_client,
            assistant: Assistant::new(Arc::new(ai_client)),
        };

        let server = TestServer::new(create_app(state)).unwrap();

        Self {
            server,
            google,
            llm,
        }
    }

    fn authorized(request: TestRequest) -> TestRequest {
        request.add_header(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", TOKEN)).unwrap(),
        )
    }

    pub fn get(&self, path: &str) -> TestRequest {
        Self::authorized(self.server.get(path))
    }

    pub fn post(&self, path: &str) -> TestRequest {
        Self::authorized(self.server.post(path))
    }

    pub fn put(&self, path: &str) -> TestRequest {
        Self::authorized(self.server.put(path))
    }

    pub fn patch(&self, path: &str) -> TestRequest {
        Self::authorized(self.server.patch(path))
    }

    pub fn delete(&self, path: &str) -> TestRequest {
        Self::authorized(self.server.delete(path))
    }
}

pub fn error_message(response: &TestResponse) -> String {
    response.json::<Value>()["error"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
