use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// ----- QueueStats ------------------------------------------------------------

/// Depth of every lifecycle stage of one queue, plus its pause flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub scheduled: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub paused: bool,
}

// -----------------------------------------------------------------------------
// ----- QueueInfo -------------------------------------------------------------

/// A `<prefix>:queues` member (`name:priority`) split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    pub priority: String,
    pub paused: bool,
}

impl QueueInfo {
    /// Priority defaults to `"0"` when the member carries none.
    pub fn split_member(member: &str) -> (&str, &str) {
        match member.split_once(':') {
            Some((name, priority)) => (name, priority),
            None => (member, "0"),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
