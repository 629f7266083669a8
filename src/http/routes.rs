use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use super::handlers;
use crate::config::SessionSettings;
use crate::dashboard::Dashboard;
use crate::store::Connector;

// -----------------------------------------------------------------------------
// ----- AppState --------------------------------------------------------------

pub struct AppState<K: Connector> {
    pub dashboard: Dashboard<K>,
    pub session: SessionSettings,
}

impl<K: Connector> AppState<K> {
    pub fn new(dashboard: Dashboard<K>, session: SessionSettings) -> Self {
        Self { dashboard, session }
    }
}

// -----------------------------------------------------------------------------
// ----- Router ----------------------------------------------------------------

pub fn router<K: Connector>(state: Arc<AppState<K>>) -> Router {
    Router::new()
        .route(
            "/api/redis/connect",
            post(handlers::connect::<K>)
                .get(handlers::connection_status::<K>)
                .delete(handlers::disconnect::<K>),
        )
        .route("/api/queue", get(handlers::list_queues::<K>))
        .route("/api/queue/overview", get(handlers::queue_overview::<K>))
        .route("/api/queue/{queue}/stats", get(handlers::queue_stats::<K>))
        .route("/api/queue/{queue}/memory", get(handlers::queue_memory::<K>))
        .route("/api/queue/{queue}/pause", post(handlers::pause_queue::<K>))
        .route("/api/queue/{queue}/unpause", post(handlers::unpause_queue::<K>))
        .route("/api/queue/{queue}/task/{id}", get(handlers::get_task::<K>))
        .route("/api/queue/{queue}/{state}/tasks", get(handlers::list_tasks::<K>))
        .with_state(state)
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
