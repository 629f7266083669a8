pub mod backend_connection;
pub mod client;

pub use backend_connection::BackendConnection;
pub use client::{RespClient, RespConnector};
