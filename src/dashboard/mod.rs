pub mod dashboard;
pub mod keyspace;

pub use dashboard::{Dashboard, DEFAULT_SCAN_COUNT, bytes_to_mb};
pub use keyspace::{DEFAULT_PREFIX, Keyspace};
