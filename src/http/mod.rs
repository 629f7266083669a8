pub mod error;
pub mod handlers;
pub mod routes;
pub mod session;

pub use routes::{AppState, router};
