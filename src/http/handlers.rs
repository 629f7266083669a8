use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::error::status_for;
use super::routes::AppState;
use super::session::{session_cookie, session_id};
use crate::errors::DashboardError;
use crate::shared_types::{LifecycleStage, QueueInfo, QueueStats, SessionToken, Task};
use crate::store::Connector;

// -----------------------------------------------------------------------------
// ----- Bodies ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub uri: Option<String>,
}

type Shared<K> = State<Arc<AppState<K>>>;

// -----------------------------------------------------------------------------
// ----- Connection ------------------------------------------------------------

/// POST /api/redis/connect
pub async fn connect<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return connect_failed(rejection.status(), rejection.body_text()),
    };
    let Some(uri) = body.uri else {
        let e = DashboardError::MissingEndpoint;
        return connect_failed(status_for(&e), e.to_string());
    };

    let cookie_name = &state.session.cookie_name;
    let session = session_id(&headers, cookie_name)
        .unwrap_or_else(|| SessionToken::random().into_string());

    match state.dashboard.connect(&session, &uri).await {
        Ok(()) => {
            let mut response = Json(json!({ "connected": true })).into_response();
            if let Some(cookie) = session_cookie(cookie_name, &session, state.session.max_age) {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            response
        }
        Err(e) => connect_failed(status_for(&e), e.to_string()),
    }
}

/// GET /api/redis/connect
pub async fn connection_status<K: Connector>(State(state): Shared<K>, headers: HeaderMap) -> Json<Value> {
    let connected = match session_id(&headers, &state.session.cookie_name) {
        Some(session) => state.dashboard.is_connected(&session).await,
        None => false,
    };
    Json(json!({ "connected": connected }))
}

/// DELETE /api/redis/connect
pub async fn disconnect<K: Connector>(State(state): Shared<K>, headers: HeaderMap) -> Json<Value> {
    if let Some(session) = session_id(&headers, &state.session.cookie_name) {
        state.dashboard.disconnect(&session).await;
    }
    Json(json!({ "connected": false }))
}

// -----------------------------------------------------------------------------
// ----- Queues ----------------------------------------------------------------

/// GET /api/queue
pub async fn list_queues<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, DashboardError> {
    let session = require_session(&state, &headers)?;
    Ok(Json(state.dashboard.list_queues(&session).await?))
}

/// GET /api/queue/overview
pub async fn queue_overview<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
) -> Result<Json<Vec<QueueInfo>>, DashboardError> {
    let session = require_session(&state, &headers)?;
    Ok(Json(state.dashboard.queue_overview(&session).await?))
}

/// GET /api/queue/{queue}/stats
pub async fn queue_stats<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path(queue): Path<String>,
) -> Result<Json<QueueStats>, DashboardError> {
    let session = require_session(&state, &headers)?;
    Ok(Json(state.dashboard.stats(&session, &queue).await?))
}

/// GET /api/queue/{queue}/memory
pub async fn queue_memory<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path(queue): Path<String>,
) -> Result<Json<Value>, DashboardError> {
    let session = require_session(&state, &headers)?;
    let memory = state.dashboard.memory_usage_mb(&session, &queue).await?;
    Ok(Json(json!({ "memory": memory })))
}

/// POST /api/queue/{queue}/pause
pub async fn pause_queue<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path(queue): Path<String>,
) -> Result<Json<Value>, DashboardError> {
    set_paused(&state, &headers, &queue, true).await
}

/// POST /api/queue/{queue}/unpause
pub async fn unpause_queue<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path(queue): Path<String>,
) -> Result<Json<Value>, DashboardError> {
    set_paused(&state, &headers, &queue, false).await
}

// -----------------------------------------------------------------------------
// ----- Tasks -----------------------------------------------------------------

/// GET /api/queue/{queue}/{state}/tasks
pub async fn list_tasks<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path((queue, stage)): Path<(String, String)>,
) -> Result<Json<Vec<Task>>, DashboardError> {
    let session = require_session(&state, &headers)?;
    let stage: LifecycleStage = stage.parse()?;
    Ok(Json(state.dashboard.list_tasks(&session, &queue, stage).await?))
}

/// GET /api/queue/{queue}/task/{id}
pub async fn get_task<K: Connector>(
    State(state): Shared<K>,
    headers: HeaderMap,
    Path((queue, task_id)): Path<(String, String)>,
) -> Result<Response, DashboardError> {
    let session = require_session(&state, &headers)?;

    Ok(match state.dashboard.task(&session, &queue, &task_id).await? {
        Some(task) => Json(task).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("task {task_id} not found in {queue}") })),
        )
            .into_response(),
    })
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

/// Queue routes without a session cookie have nothing to talk to.
fn require_session<K: Connector>(state: &AppState<K>, headers: &HeaderMap) -> Result<String, DashboardError> {
    session_id(headers, &state.session.cookie_name).ok_or(DashboardError::NotConnected)
}

fn connect_failed(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "connected": false, "error": error }))).into_response()
}

async fn set_paused<K: Connector>(
    state: &AppState<K>,
    headers: &HeaderMap,
    queue: &str,
    paused: bool,
) -> Result<Json<Value>, DashboardError> {
    let session = require_session(state, headers)?;
    state.dashboard.set_paused(&session, queue, paused).await?;
    Ok(Json(json!({ "success": true })))
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
