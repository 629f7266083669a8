pub mod command;
pub mod error;
pub mod reply;
pub mod utils;

pub use command::Command;
pub use error::WireError;
pub use reply::{MAX_FRAME_LEN, Reply, Scan};
