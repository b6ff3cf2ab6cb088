//! HTTP routes of the control surface.

use crate::control::{ControlError, DaemonControl, LOG_TAIL_LINES};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telepost_core::Post;
use telepost_notion::NotionClient;

/// Number of upcoming posts reported by the preview endpoint.
const NEXT_POSTS_LIMIT: usize = 5;

/// Body preview length, in characters.
const PREVIEW_CHARS: usize = 80;

/// Shared handler state.
pub struct AppState {
    /// Read-only task-store client for the preview endpoint.
    pub notion: NotionClient,
    /// Daemon process control.
    pub control: DaemonControl,
}

/// Builds the control-surface router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/next-posts", get(next_posts))
        .route("/api/execute", post(execute))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    scheduler_running: bool,
    timestamp: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        scheduler_running: state.control.running_pid().is_some(),
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    lock_file_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_cycle: Option<String>,
    timestamp: String,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let pid = state.control.running_pid();
    Json(StatusResponse {
        running: pid.is_some(),
        pid,
        lock_file_present: state.control.lock_file_exists(),
        last_cycle: state.control.last_cycle(),
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}

/// Upcoming post as reported by the preview endpoint.
#[derive(Debug, Serialize)]
struct NextPost {
    id: String,
    title: String,
    post_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    publish_at: String,
    preview: String,
}

impl From<&Post> for NextPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            post_type: post.post_type.to_string(),
            channel: post.channel.clone(),
            publish_at: post.publish_at.to_rfc3339(),
            preview: preview(&post.body),
        }
    }
}

fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(PREVIEW_CHARS).collect();
    if body.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[derive(Debug, Serialize)]
struct NextPostsResponse {
    count: usize,
    posts: Vec<NextPost>,
}

async fn next_posts(State(state): State<Arc<AppState>>) -> Json<NextPostsResponse> {
    let due = state.notion.fetch_due().await;
    let posts: Vec<NextPost> = due.iter().take(NEXT_POSTS_LIMIT).map(NextPost::from).collect();
    Json(NextPostsResponse {
        count: posts.len(),
        posts,
    })
}

/// Daemon control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Start,
    Stop,
    Status,
    Logs,
    Test,
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    action: Action,
}

#[derive(Debug, Serialize)]
struct ExecuteResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl ExecuteResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            pid: None,
            logs: None,
            output: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            pid: None,
            logs: None,
            output: None,
        }
    }
}

async fn execute(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> (StatusCode, Json<ExecuteResponse>) {
    let control = &state.control;
    match request.action {
        Action::Start => match control.start() {
            Ok(pid) => {
                let mut response = ExecuteResponse::ok(format!("scheduler started with pid {pid}"));
                response.pid = Some(pid);
                (StatusCode::OK, Json(response))
            }
            Err(err) => failure(&err),
        },
        Action::Stop => match control.stop() {
            Ok(pid) => {
                let mut response =
                    ExecuteResponse::ok(format!("asked scheduler pid {pid} to stop"));
                response.pid = Some(pid);
                (StatusCode::OK, Json(response))
            }
            Err(err) => failure(&err),
        },
        Action::Status => {
            let mut response = match control.running_pid() {
                Some(pid) => {
                    let mut response =
                        ExecuteResponse::ok(format!("scheduler running with pid {pid}"));
                    response.pid = Some(pid);
                    response
                }
                None => ExecuteResponse::ok("scheduler is not running"),
            };
            if let Some(last) = control.last_cycle() {
                response.output = Some(format!("last cycle at {last}"));
            }
            (StatusCode::OK, Json(response))
        }
        Action::Logs => {
            let logs = control.tail_log(LOG_TAIL_LINES);
            let mut response = ExecuteResponse::ok(format!("{} log lines", logs.len()));
            response.logs = Some(logs);
            (StatusCode::OK, Json(response))
        }
        Action::Test => match control.run_check().await {
            Ok(check) => {
                let mut response = if check.success {
                    ExecuteResponse::ok("all connections ok")
                } else {
                    ExecuteResponse::fail("connection check failed")
                };
                response.output = Some(check.output);
                (StatusCode::OK, Json(response))
            }
            Err(err) => failure(&err),
        },
    }
}

fn failure(err: &ControlError) -> (StatusCode, Json<ExecuteResponse>) {
    let status = match err {
        ControlError::AlreadyRunning { .. } | ControlError::NotRunning => StatusCode::CONFLICT,
        ControlError::Io { .. } | ControlError::Unsupported => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ExecuteResponse::fail(err.to_string())))
}
