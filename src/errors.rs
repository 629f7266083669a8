use std::time::Duration;
use thiserror::Error;

use crate::wire::WireError;

// -----------------------------------------------------------------------------
// ----- StoreError ------------------------------------------------------------

/// Failure talking to the external store through one client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed")]
    Closed,

    #[error("store replied with error: {0}")]
    Server(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),

    #[error("unexpected reply to {command}")]
    UnexpectedReply { command: String },
}

impl StoreError {
    /// True when the failure concerns the connection itself rather than one
    /// command's reply. These fail the whole facade call; the others degrade.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_) | StoreError::Timeout(_) | StoreError::Closed | StoreError::Protocol(_)
        )
    }

    pub fn unexpected(command: impl Into<String>) -> Self {
        StoreError::UnexpectedReply {
            command: command.into(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- DashboardError --------------------------------------------------------

/// Errors surfaced to the caller of the registry and the query facade.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("store not connected")]
    NotConnected,

    #[error("missing session identifier")]
    MissingSession,

    #[error("missing store endpoint")]
    MissingEndpoint,

    #[error("unknown lifecycle stage '{0}'")]
    InvalidStage(String),

    #[error("failed to connect to store: {0}")]
    Connect(#[source] StoreError),

    #[error("store command failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotConnected,
    InvalidInput,
    TransportFailure,
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::NotConnected => ErrorKind::NotConnected,
            DashboardError::MissingSession
            | DashboardError::MissingEndpoint
            | DashboardError::InvalidStage(_) => ErrorKind::InvalidInput,
            DashboardError::Connect(_) | DashboardError::Store(_) => ErrorKind::TransportFailure,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
