pub mod lifecycle_stage;
pub mod queue_stats;
pub mod session_token;
pub mod task;

pub use lifecycle_stage::LifecycleStage;
pub use queue_stats::{QueueInfo, QueueStats};
pub use session_token::SessionToken;
pub use task::Task;
