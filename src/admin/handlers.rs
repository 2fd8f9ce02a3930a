use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::process::{ProcessError, ProcessId, ProcessInfo};
use crate::supervisor::SupervisorState;

#[derive(Debug, Serialize)]
pub struct GatewayStatus {
    pub ok: bool,
    /// `running`, `not_responding` or `not_running`.
    pub status: &'static str,
    pub state: SupervisorState,
    pub process_id: Option<ProcessId>,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub uptime_secs: u64,
    pub version: &'static str,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<GatewayStatus> {
    let supervisor = &state.supervisor;
    let child = supervisor.child();
    let exit_code = supervisor.last_exit().and_then(|exit| exit.code);

    let status = match &child {
        None => "not_running",
        Some(_) => {
            let timeout = Duration::from_millis(state.readiness_timeout_ms);
            match supervisor
                .backend()
                .wait_for_readiness(supervisor.child_addr(), timeout)
                .await
            {
                Ok(()) => "running",
                Err(_) => "not_responding",
            }
        }
    };

    Json(GatewayStatus {
        ok: status == "running",
        status,
        state: supervisor.state(),
        process_id: child.as_ref().map(|c| c.id),
        pid: child.as_ref().and_then(|c| c.pid),
        exit_code,
        uptime_secs: supervisor.uptime().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn get_logs(State(state): State<AdminState>) -> String {
    state.supervisor.diagnostics().read_logs().await
}

pub async fn get_processes(State(state): State<AdminState>) -> Json<Vec<ProcessInfo>> {
    Json(state.supervisor.backend().list().await)
}

pub async fn get_process_logs(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = ProcessId::parse(&id) else {
        return (StatusCode::BAD_REQUEST, "Invalid process id").into_response();
    };

    match state.supervisor.backend().fetch_logs(id).await {
        Ok(logs) => logs.into_response(),
        Err(ProcessError::NotFound(_)) => (StatusCode::NOT_FOUND, "Unknown process").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
