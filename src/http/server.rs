//! Public HTTP server.
//!
//! # Responsibilities
//! - Accept every method and path on the public listener
//! - Dispatch on supervisor state: forward, loading page, or error page
//! - Stream requests and responses through unmodified while RUNNING
//! - Tag each request with a generated id in its tracing span

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Uri, Version},
    response::Response,
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::PagesConfig;
use crate::http::pages::Pages;
use crate::observability::metrics::{self, RequestOutcome};
use crate::supervisor::{Supervisor, SupervisorState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub client: Client<HttpConnector, Body>,
    pub pages: Arc<Pages>,
}

/// HTTP server for the public port.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(supervisor: Arc<Supervisor>, pages: &PagesConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let pages = Arc::new(Pages::new(pages, supervisor.child_addr().port()));

        let state = AppState {
            supervisor,
            client,
            pages,
        };

        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
    }

    /// The router, for serving on a custom listener or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Public listener ready");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Public listener stopped");
        Ok(())
    }
}

/// Route one request by the supervisor's current state.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let (response, outcome) = match state.supervisor.state() {
        SupervisorState::Running => forward(&state, request).await,
        SupervisorState::Starting => (state.pages.loading(), RequestOutcome::Loading),
        SupervisorState::Crashed => {
            let logs = state.supervisor.diagnostics().read_logs().await;
            (
                state.pages.error("OpenClaw Crashed", &logs),
                RequestOutcome::Crashed,
            )
        }
    };

    metrics::record_request(&method, response.status().as_u16(), outcome, start);
    response
}

/// Forward to the child and stream its response back untouched.
async fn forward(state: &AppState, request: Request<Body>) -> (Response, RequestOutcome) {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("http://{}{}", state.supervisor.child_addr(), path_and_query);
    parts.uri = match target.parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(target_uri = %target, error = %e, "Invalid upstream URI");
            return (
                state.pages.error("Proxy Connection Failed", &e.to_string()),
                RequestOutcome::ProxyError,
            );
        }
    };
    // The child speaks plain HTTP/1.1 on loopback whatever the client negotiated.
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => (stream_back(response), RequestOutcome::Proxied),
        Err(e) => {
            let message = error_chain(&e);
            tracing::error!(error = %message, "Proxy error");
            (
                state.pages.error("Proxy Connection Failed", &message),
                RequestOutcome::ProxyError,
            )
        }
    }
}

fn stream_back(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Render an error with its sources, e.g. "client error (Connect): Connection refused".
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WrapperConfig;
    use crate::gateway_config::NoopGenerator;
    use crate::process::{
        LaunchSpec, OutputChunk, OutputStream, ProcessBackend, ProcessError, ProcessId,
        ProcessInfo, SpawnedProcess,
    };
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tower::ServiceExt;

    struct IdleBackend;

    #[async_trait]
    impl ProcessBackend for IdleBackend {
        async fn spawn(&self, spec: &LaunchSpec) -> Result<SpawnedProcess, ProcessError> {
            Err(ProcessError::Spawn {
                command: spec.command_line(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
        async fn list(&self) -> Vec<ProcessInfo> {
            Vec::new()
        }
        async fn wait_for_readiness(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProcessError> {
            Err(ProcessError::NotReady { addr, timeout })
        }
        async fn terminate(&self, id: ProcessId) -> Result<(), ProcessError> {
            Err(ProcessError::NotFound(id))
        }
        async fn fetch_logs(&self, id: ProcessId) -> Result<String, ProcessError> {
            Err(ProcessError::NotFound(id))
        }
    }

    fn supervisor(child_port: u16, log_dir: &std::path::Path) -> Arc<Supervisor> {
        let mut config = WrapperConfig::default();
        config.child.port = child_port;
        config.logs.path = log_dir.join("gateway.log");
        config.logs.echo = false;
        Supervisor::new(&config, Arc::new(IdleBackend), Arc::new(NoopGenerator))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn starting_serves_loading_page_for_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let router = HttpServer::new(supervisor(3001, dir.path()), &PagesConfig::default()).router();

        for (method, path) in [("GET", "/"), ("POST", "/api/chat"), ("DELETE", "/x/y?z=1")] {
            let request = Request::builder().method(method).uri(path).body(Body::empty()).unwrap();
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert!(body_text(response).await.contains("is Starting..."));
        }
    }

    #[tokio::test]
    async fn crashed_serves_escaped_logs() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(3001, dir.path());
        supervisor.diagnostics().reset().await.unwrap();
        supervisor
            .diagnostics()
            .record(&OutputChunk {
                stream: OutputStream::Stderr,
                data: b"Error: <gateways> missing\n".to_vec(),
            })
            .await;
        supervisor.state_cell().mark_crashed();

        let router = HttpServer::new(supervisor, &PagesConfig::default()).router();
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("OpenClaw Crashed"));
        assert!(body.contains("Error: &lt;gateways&gt; missing"));
    }

    #[tokio::test]
    async fn running_forwards_to_child() {
        let child = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = child.local_addr().unwrap().port();
        let app = Router::new().route(
            "/echo",
            any(|request: Request<Body>| async move {
                let query = request.uri().query().unwrap_or_default().to_string();
                (StatusCode::CREATED, [("x-child", "yes")], format!("{} {}", request.method(), query))
            }),
        );
        tokio::spawn(async move {
            axum::serve(child, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(port, dir.path());
        supervisor.state_cell().promote_running();

        let router = HttpServer::new(supervisor, &PagesConfig::default()).router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/echo?a=1")
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-child"], "yes");
        assert_eq!(body_text(response).await, "PUT a=1");
    }

    #[tokio::test]
    async fn forward_failure_is_500_without_state_change() {
        let port = unused_port().await;
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(port, dir.path());
        supervisor.state_cell().promote_running();

        let router = HttpServer::new(supervisor.clone(), &PagesConfig::default()).router();
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("Proxy Connection Failed"));
        assert_eq!(supervisor.state(), SupervisorState::Running);
    }
}
