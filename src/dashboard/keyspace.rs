use crate::shared_types::LifecycleStage;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_PREFIX: &str = "cppq";

// -----------------------------------------------------------------------------
// ----- Keyspace --------------------------------------------------------------

/// Key names of the queue layout:
///
/// ```text
/// <prefix>:queues                 set of "name:priority"
/// <prefix>:queues:paused          set of base names
/// <prefix>:<queue>:<stage>        list of task ids
/// <prefix>:<queue>:task:<id>      hash of task fields
/// ```
#[derive(Debug, Clone)]
pub struct Keyspace {
    prefix: String,
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

// -----------------------------------------------------------------------------
// ----- Keyspace: Static ------------------------------------------------------

impl Keyspace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Queue names may carry a `:priority` suffix; keys use the part before it.
    pub fn base_name(queue: &str) -> &str {
        queue.split_once(':').map_or(queue, |(base, _)| base)
    }
}

// -----------------------------------------------------------------------------
// ----- Keyspace: Public ------------------------------------------------------

impl Keyspace {
    pub fn queues(&self) -> String {
        format!("{}:queues", self.prefix)
    }

    pub fn paused(&self) -> String {
        format!("{}:queues:paused", self.prefix)
    }

    pub fn stage(&self, queue: &str, stage: LifecycleStage) -> String {
        format!("{}:{}:{}", self.prefix, Self::base_name(queue), stage.as_str())
    }

    pub fn task(&self, queue: &str, task_id: &str) -> String {
        format!("{}:{}:task:{}", self.prefix, Self::base_name(queue), task_id)
    }

    /// SCAN MATCH pattern for every key in the queue's namespace.
    pub fn namespace_pattern(&self, queue: &str) -> String {
        format!(
            "{}:{}:*",
            escape_glob(&self.prefix),
            escape_glob(Self::base_name(queue))
        )
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
