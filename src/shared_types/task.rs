use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// -----------------------------------------------------------------------------
// ----- Task ------------------------------------------------------------------

/// One task's hash record. Every value is passed through as the producer
/// wrote it; payload and result are never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub payload: String,
    pub max_retry: String,
    pub retry_count: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dequeue_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

// -----------------------------------------------------------------------------
// ----- Task: Static ----------------------------------------------------------

impl Task {
    /// Build from HGETALL fields. An empty record means the task was deleted
    /// out of band and yields `None`.
    pub fn from_fields(uuid: impl Into<String>, mut fields: HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }

        Some(Task {
            uuid: uuid.into(),
            task_type: fields.remove("type").unwrap_or_default(),
            payload: fields.remove("payload").unwrap_or_default(),
            max_retry: fields.remove("maxRetry").unwrap_or_else(|| "0".to_string()),
            retry_count: fields.remove("retried").unwrap_or_else(|| "0".to_string()),
            schedule_time: fields.remove("schedule"),
            cron: fields.remove("cron"),
            dequeue_time: fields.remove("dequeuedAtMs"),
            result: fields.remove("result"),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
