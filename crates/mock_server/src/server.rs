//! Axum-based mock of the sandbox service.

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use sandboxai_core::{
    types::{
        ApiError, CreateSandboxRequest, HealthStatus, RunIPythonCellRequest,
        RunIPythonCellResponse, RunShellCommandRequest, RunShellCommandResponse, Sandbox,
    },
    Error, Result, DEFAULT_IMAGE,
};

use crate::kernel;

const NAME_LENGTH: usize = 20;
const NAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890";

/// Shared application state.
pub struct MockState {
    sandboxes: DashMap<(String, String), Sandbox>,
    default_image: String,
    created_total: AtomicUsize,
    deleted_total: AtomicUsize,
}

impl MockState {
    fn new(default_image: String) -> Self {
        Self {
            sandboxes: DashMap::new(),
            default_image,
            created_total: AtomicUsize::new(0),
            deleted_total: AtomicUsize::new(0),
        }
    }

    /// Number of sandboxes currently alive.
    pub fn sandbox_count(&self) -> usize {
        self.sandboxes.len()
    }

    /// Number of successful creates since startup.
    pub fn created_total(&self) -> usize {
        self.created_total.load(Ordering::SeqCst)
    }

    /// Number of successful deletes since startup.
    pub fn deleted_total(&self) -> usize {
        self.deleted_total.load(Ordering::SeqCst)
    }

    pub fn get(&self, space: &str, name: &str) -> Option<Sandbox> {
        self.sandboxes
            .get(&(space.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Delete every sandbox, returning how many were removed.
    pub fn delete_all(&self) -> usize {
        let keys: Vec<(String, String)> = self.sandboxes.iter().map(|e| e.key().clone()).collect();
        let total = keys.len();
        for (i, (space, name)) in keys.into_iter().enumerate() {
            tracing::info!("Cleanup: deleting {}/{}: sandbox {} in space {}", i + 1, total, name, space);
            if self.sandboxes.remove(&(space, name)).is_some() {
                self.deleted_total.fetch_add(1, Ordering::SeqCst);
            }
        }
        total
    }
}

/// Mock sandbox service.
pub struct MockSandboxServer {
    state: Arc<MockState>,
}

impl MockSandboxServer {
    /// Create a mock server with the default box image.
    pub fn new() -> Self {
        Self::with_default_image(DEFAULT_IMAGE)
    }

    /// Create a mock server that fills in `image` when a create request leaves it empty.
    pub fn with_default_image(image: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MockState::new(image.into())),
        }
    }

    /// Shared state, for inspection after the server has been moved into a task.
    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }

    /// Build the Axum router. All routes live under `/v1`.
    pub fn build_router(&self) -> Router {
        let api = Router::new()
            .route("/healthz", get(health_handler))
            .route("/spaces/:space/sandboxes", post(create_handler))
            .route(
                "/spaces/:space/sandboxes/:name",
                get(get_handler).delete(delete_handler),
            )
            // `tools:<tool>` is matched in the handler; a literal colon mid-segment
            // is ambiguous to the router.
            .route("/spaces/:space/sandboxes/:name/:tool", post(tool_handler))
            .with_state(self.state.clone());

        Router::new()
            .nest("/v1", api)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: tokio::net::TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::transport(format!("Mock server error: {}", e)))
    }

    /// Serve on an ephemeral localhost port from a background thread with its own runtime.
    pub fn spawn(self) -> std::io::Result<RunningMockServer> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let state = self.state();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("mock-sandboxaid".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(l) => l,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to register mock listener");
                            return;
                        }
                    };
                    let shutdown = async {
                        let _ = shutdown_rx.await;
                    };
                    if let Err(e) = self.run(listener, shutdown).await {
                        tracing::error!(error = %e, "Mock server stopped with error");
                    }
                });
            })?;

        tracing::debug!(addr = %addr, "Mock sandbox server listening");

        Ok(RunningMockServer {
            base_url: format!("http://{}/v1", addr),
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl Default for MockSandboxServer {
    fn default() -> Self {
        Self::new()
    }
}

/// A mock server running on a background thread. Dropping it shuts the server down.
pub struct RunningMockServer {
    base_url: String,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl RunningMockServer {
    /// Base URL including the `/v1` prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for RunningMockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            message: message.into(),
        }),
    )
        .into_response()
}

fn random_name() -> String {
    let mut rng = rand::thread_rng();
    (0..NAME_LENGTH)
        .map(|_| NAME_CHARSET[rng.gen_range(0..NAME_CHARSET.len())] as char)
        .collect()
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthStatus {
        status: "OK".to_string(),
    })
}

async fn create_handler(
    State(state): State<Arc<MockState>>,
    Path(space): Path<String>,
    Json(payload): Json<CreateSandboxRequest>,
) -> Response {
    let name = payload
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(random_name);
    let mut spec = payload.spec;
    if spec.image.is_empty() {
        spec.image = state.default_image.clone();
    }

    let key = (space.clone(), name.clone());
    if state.sandboxes.contains_key(&key) {
        return api_error(
            StatusCode::CONFLICT,
            format!("sandbox {:?} already exists in space {:?}", name, space),
        );
    }

    let sandbox = Sandbox { space, name, spec };
    state.sandboxes.insert(key, sandbox.clone());
    state.created_total.fetch_add(1, Ordering::SeqCst);

    tracing::info!(space = %sandbox.space, name = %sandbox.name, image = %sandbox.spec.image, "Sandbox created");
    (StatusCode::CREATED, Json(sandbox)).into_response()
}

async fn get_handler(
    State(state): State<Arc<MockState>>,
    Path((space, name)): Path<(String, String)>,
) -> Response {
    match state.get(&space, &name) {
        Some(sandbox) => Json(sandbox).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "sandbox not found"),
    }
}

async fn delete_handler(
    State(state): State<Arc<MockState>>,
    Path((space, name)): Path<(String, String)>,
) -> Response {
    match state.sandboxes.remove(&(space.clone(), name.clone())) {
        Some(_) => {
            state.deleted_total.fetch_add(1, Ordering::SeqCst);
            tracing::info!(space = %space, name = %name, "Sandbox deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        None => api_error(StatusCode::NOT_FOUND, "sandbox not found"),
    }
}

async fn tool_handler(
    State(state): State<Arc<MockState>>,
    Path((space, name, tool)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let Some(sandbox) = state.get(&space, &name) else {
        return api_error(StatusCode::NOT_FOUND, "sandbox not found");
    };

    match tool.as_str() {
        "tools:run_ipython_cell" => {
            let request: RunIPythonCellRequest = match serde_json::from_slice(&body) {
                Ok(r) => r,
                Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
            };
            let result = kernel::run_cell(&request.code, request.split_output);
            Json(RunIPythonCellResponse::from(result)).into_response()
        }
        "tools:run_shell_command" => {
            let request: RunShellCommandRequest = match serde_json::from_slice(&body) {
                Ok(r) => r,
                Err(e) => return api_error(StatusCode::BAD_REQUEST, e.to_string()),
            };
            match kernel::run_shell(&request.command, request.split_output, sandbox.spec.env.as_ref())
                .await
            {
                Ok(result) => Json(RunShellCommandResponse::from(result)).into_response(),
                Err(e) => api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to execute shell command: {}", e),
                ),
            }
        }
        other => api_error(StatusCode::NOT_FOUND, format!("unknown tool {:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandboxai_client::HttpClient;
    use sandboxai_core::{traits::SandboxApi, types::SandboxSpec};

    #[test]
    fn test_random_name_shape() {
        let name = random_name();
        assert_eq!(name.len(), NAME_LENGTH);
        assert!(name.bytes().all(|b| NAME_CHARSET.contains(&b)));
    }

    #[test]
    fn test_empty_image_gets_default() {
        let server = MockSandboxServer::with_default_image("box:test").spawn().unwrap();
        let client = HttpClient::new(server.base_url()).unwrap();

        let created = client
            .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("")))
            .unwrap();
        assert_eq!(created.spec.image, "box:test");
        assert_eq!(server.state().sandbox_count(), 1);
    }

    #[test]
    fn test_tool_in_other_space_is_not_found() {
        let server = MockSandboxServer::new().spawn().unwrap();
        let client = HttpClient::new(server.base_url()).unwrap();
        let created = client
            .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
            .unwrap();

        let err = client
            .run_shell_command(
                "other-space",
                &created.name,
                &RunShellCommandRequest::new("true"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { actual: 404, .. }));
    }

    #[test]
    fn test_delete_all_clears_state() {
        let server = MockSandboxServer::new().spawn().unwrap();
        let client = HttpClient::new(server.base_url()).unwrap();
        for _ in 0..3 {
            client
                .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
                .unwrap();
        }

        assert_eq!(server.state().delete_all(), 3);
        assert_eq!(server.state().sandbox_count(), 0);
        assert_eq!(server.state().created_total(), 3);
        assert_eq!(server.state().deleted_total(), 3);
    }
}
