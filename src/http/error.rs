use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::errors::{DashboardError, ErrorKind, StoreError};

// -----------------------------------------------------------------------------
// ----- Status mapping --------------------------------------------------------

pub fn status_for(err: &DashboardError) -> StatusCode {
    match (err.kind(), err) {
        (_, DashboardError::Connect(StoreError::InvalidEndpoint(_))) => StatusCode::BAD_REQUEST,
        (ErrorKind::InvalidInput, _) => StatusCode::BAD_REQUEST,
        (ErrorKind::NotConnected, _) => StatusCode::SERVICE_UNAVAILABLE,
        (ErrorKind::TransportFailure, _) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status == StatusCode::BAD_GATEWAY {
            warn!("{self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
