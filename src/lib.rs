pub mod backend;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod http;
pub mod registry;
pub mod shared_types;
pub mod store;
pub mod wire;

pub use backend::{RespClient, RespConnector};
pub use config::Config;
pub use dashboard::{Dashboard, Keyspace};
pub use errors::{DashboardError, ErrorKind, StoreError};
pub use registry::{ConnectionLease, ConnectionRegistry};
pub use store::{Connector, Endpoint, StoreClient};
