//! Outbound boundary: what the registry and the facade need from a store
//! client. `backend::RespClient` is the production implementation; anything
//! that speaks this protocol can back the dashboard unchanged.

pub mod endpoint;

use std::future::Future;

use crate::errors::StoreError;
use crate::wire::{Command, Reply};

pub use endpoint::{Endpoint, EndpointParts};

// -----------------------------------------------------------------------------
// ----- StoreClient -----------------------------------------------------------

pub trait StoreClient: Send + Sync + 'static {
    /// The transport exists and has not been closed.
    fn is_open(&self) -> bool;

    /// The transport is open and the last exchange on it succeeded.
    fn is_ready(&self) -> bool;

    /// Open (or reopen) the transport using the endpoint the client was
    /// created with, including any handshake. On success the client is ready.
    fn open(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Liveness probe. Success marks the client ready again.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Issue one command. Error replies come back as `StoreError::Server`.
    fn call(&self, command: Command) -> impl Future<Output = Result<Reply, StoreError>> + Send;

    /// Orderly shutdown handshake.
    fn quit(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Drop the transport immediately. Never fails.
    fn terminate(&self);
}

// -----------------------------------------------------------------------------
// ----- Connector -------------------------------------------------------------

/// Builds unopened clients for the registry.
pub trait Connector: Send + Sync + 'static {
    type Client: StoreClient;

    /// `session_id` is only used to tag diagnostics emitted by the client.
    fn client(&self, session_id: &str, endpoint: &Endpoint) -> Self::Client;
}
