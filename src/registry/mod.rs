pub mod managed;
pub mod readiness;
pub mod registry;

pub use managed::{ConnectionLease, ManagedConnection};
pub use readiness::{HealError, HealStep, Readiness};
pub use registry::ConnectionRegistry;
