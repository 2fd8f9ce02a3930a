//! Admin API over its own router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use openclaw_wrapper::admin::setup_admin_router;
use openclaw_wrapper::config::AdminConfig;
use openclaw_wrapper::gateway_config::NoopGenerator;
use openclaw_wrapper::process::OutputStream;
use openclaw_wrapper::{Supervisor, SupervisorState};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

mod common;

use common::FakeBackend;

fn admin_config(api_key: Option<&str>) -> AdminConfig {
    AdminConfig {
        enabled: true,
        api_key: api_key.map(str::to_string),
        readiness_timeout_ms: 200,
        ..AdminConfig::default()
    }
}

async fn get(router: &Router, uri: &str, key: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri);
    if let Some(key) = key {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_admin_requires_key_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(common::free_port().await, dir.path());
    let supervisor = Supervisor::new(&config, FakeBackend::new(), Arc::new(NoopGenerator));
    let router = setup_admin_router(supervisor, &admin_config(Some("s3cret")));

    let (status, _) = get(&router, "/admin/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&router, "/admin/status", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&router, "/admin/status", Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "not_running");
    assert_eq!(json["state"], "starting");
}

#[tokio::test]
async fn test_status_reports_running_child() {
    let dir = tempfile::tempdir().unwrap();
    let child = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let child_port = child.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(child, Router::new().route("/", axum::routing::get(|| async { "ok" })))
            .await
            .unwrap();
    });

    let config = common::test_config(child_port, dir.path());
    let supervisor = Supervisor::new(&config, FakeBackend::new(), Arc::new(NoopGenerator));
    supervisor.start().await;
    assert!(common::wait_for_state(&supervisor, SupervisorState::Running, Duration::from_secs(5)).await);

    let router = setup_admin_router(supervisor.clone(), &admin_config(None));
    let (status, body) = get(&router, "/admin/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["status"], "running");
    assert_eq!(json["state"], "running");
    assert_eq!(json["pid"], 4242);

    let (status, body) = get(&router, "/admin/processes", None).await;
    assert_eq!(status, StatusCode::OK);
    let processes: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(processes[0]["status"], "running");
    let id = processes[0]["id"].as_str().unwrap().to_string();

    let (status, _) = get(&router, &format!("/admin/processes/{}/logs", id), None).await;
    assert_eq!(status, StatusCode::OK);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_status_after_crash_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(common::free_port().await, dir.path());
    let backend = FakeBackend::new();
    let supervisor = Supervisor::new(&config, backend.clone(), Arc::new(NoopGenerator));
    supervisor.start().await;

    backend.emit(OutputStream::Stderr, "gateway panicked\n");
    backend.exit(Some(2));
    assert!(common::wait_for_state(&supervisor, SupervisorState::Crashed, Duration::from_secs(5)).await);

    let router = setup_admin_router(supervisor, &admin_config(None));
    let (_, body) = get(&router, "/admin/status", None).await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ok"], false);
    assert_eq!(json["status"], "not_running");
    assert_eq!(json["state"], "crashed");
    assert_eq!(json["exit_code"], 2);
    assert!(json["process_id"].is_null());

    let (status, logs) = get(&router, "/admin/logs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs, "gateway panicked\n");
}

#[tokio::test]
async fn test_process_logs_rejects_bad_ids() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(common::free_port().await, dir.path());
    let supervisor = Supervisor::new(&config, FakeBackend::new(), Arc::new(NoopGenerator));
    let router = setup_admin_router(supervisor, &admin_config(None));

    let (status, _) = get(&router, "/admin/processes/not-a-uuid/logs", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(
        &router,
        "/admin/processes/67e55044-10b1-426f-9247-bb680e5fe0c8/logs",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
