use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::keyspace::Keyspace;
use crate::errors::{DashboardError, StoreError};
use crate::registry::{ConnectionLease, ConnectionRegistry};
use crate::shared_types::{LifecycleStage, QueueInfo, QueueStats, Task};
use crate::store::{Connector, StoreClient};
use crate::wire::{Command, Reply};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_SCAN_COUNT: u32 = 100;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// -----------------------------------------------------------------------------
// ----- Dashboard -------------------------------------------------------------

/// Dashboard questions answered against a session's store connection. Every
/// operation borrows the connection from the registry for its own duration.
pub struct Dashboard<K: Connector> {
    registry: Arc<ConnectionRegistry<K>>,
    keys: Keyspace,
    scan_count: u32,
}

// -----------------------------------------------------------------------------
// ----- Dashboard: Static -----------------------------------------------------

impl<K: Connector> Dashboard<K> {
    pub fn new(registry: Arc<ConnectionRegistry<K>>, keys: Keyspace, scan_count: u32) -> Self {
        Self {
            registry,
            keys,
            scan_count: scan_count.max(1),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Dashboard: Sessions ---------------------------------------------------

impl<K: Connector> Dashboard<K> {
    pub fn registry(&self) -> &Arc<ConnectionRegistry<K>> {
        &self.registry
    }

    pub async fn connect(&self, session_id: &str, endpoint: &str) -> Result<(), DashboardError> {
        self.registry.connect(session_id, endpoint).await
    }

    pub async fn disconnect(&self, session_id: &str) {
        self.registry.disconnect(session_id).await
    }

    pub async fn is_connected(&self, session_id: &str) -> bool {
        match self.registry.acquire(session_id).await {
            Some(conn) => conn.is_ready(),
            None => false,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Dashboard: Queries ----------------------------------------------------

impl<K: Connector> Dashboard<K> {
    /// Members of the queue registry set, as stored (`name:priority`).
    pub async fn list_queues(&self, session_id: &str) -> Result<Vec<String>, DashboardError> {
        let conn = self.lease(session_id).await?;

        let reply = conn.call(Command::smembers(&self.keys.queues())).await?;
        reply
            .into_strings()
            .ok_or_else(|| StoreError::unexpected("SMEMBERS").into())
    }

    /// Every queue with its priority and pause flag, sorted by name then
    /// priority.
    pub async fn queue_overview(&self, session_id: &str) -> Result<Vec<QueueInfo>, DashboardError> {
        let conn = self.lease(session_id).await?;

        let (members, paused) = tokio::join!(
            conn.call(Command::smembers(&self.keys.queues())),
            conn.call(Command::smembers(&self.keys.paused())),
        );

        let members = members?
            .into_strings()
            .ok_or_else(|| StoreError::unexpected("SMEMBERS"))?;
        let paused: HashSet<String> = paused?
            .into_strings()
            .ok_or_else(|| StoreError::unexpected("SMEMBERS"))?
            .into_iter()
            .collect();

        let mut infos: Vec<QueueInfo> = members
            .iter()
            .map(|member| {
                let (name, priority) = QueueInfo::split_member(member);
                QueueInfo {
                    name: name.to_string(),
                    priority: priority.to_string(),
                    paused: paused.contains(name),
                }
            })
            .collect();
        infos.sort();

        Ok(infos)
    }

    /// Stage depths and pause flag, fetched concurrently over the one
    /// connection. A depth the store cannot report counts as 0.
    pub async fn stats(&self, session_id: &str, queue: &str) -> Result<QueueStats, DashboardError> {
        let conn = self.lease(session_id).await?;

        let depth_of = |stage| conn.call(Command::llen(&self.keys.stage(queue, stage)));
        let (pending, scheduled, active, completed, failed, paused) = tokio::join!(
            depth_of(LifecycleStage::Pending),
            depth_of(LifecycleStage::Scheduled),
            depth_of(LifecycleStage::Active),
            depth_of(LifecycleStage::Completed),
            depth_of(LifecycleStage::Failed),
            conn.call(Command::sismember(&self.keys.paused(), Keyspace::base_name(queue))),
        );

        Ok(QueueStats {
            pending: count_or_zero(pending, "pending")?,
            scheduled: count_or_zero(scheduled, "scheduled")?,
            active: count_or_zero(active, "active")?,
            completed: count_or_zero(completed, "completed")?,
            failed: count_or_zero(failed, "failed")?,
            paused: count_or_zero(paused, "paused")? > 0,
        })
    }

    /// Resident size of every key in the queue's namespace, rounded to the
    /// nearest megabyte. Keys whose size cannot be read contribute nothing.
    pub async fn memory_usage_mb(&self, session_id: &str, queue: &str) -> Result<u64, DashboardError> {
        let conn = self.lease(session_id).await?;
        let keys = self.scan_namespace(&conn, queue).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let sizes = join_all(keys.iter().map(|key| conn.call(Command::memory_usage(key)))).await;

        let total: u64 = keys
            .iter()
            .zip(sizes)
            .map(|(key, size)| match size {
                Ok(reply) => reply.as_integer().and_then(|n| u64::try_from(n).ok()).unwrap_or(0),
                Err(e) => {
                    debug!("MEMORY USAGE {key} failed, counting 0: {e}");
                    0
                }
            })
            .sum();

        Ok(bytes_to_mb(total))
    }

    pub async fn set_paused(&self, session_id: &str, queue: &str, paused: bool) -> Result<(), DashboardError> {
        let conn = self.lease(session_id).await?;

        let key = self.keys.paused();
        let name = Keyspace::base_name(queue);
        let command = if paused {
            Command::sadd(&key, name)
        } else {
            Command::srem(&key, name)
        };
        conn.call(command).await?;

        info!(
            "queue {name} {} [session={session_id}]",
            if paused { "paused" } else { "unpaused" }
        );
        Ok(())
    }

    /// Tasks in one stage, in list order. Ids whose record has gone missing
    /// are skipped.
    pub async fn list_tasks(
        &self,
        session_id: &str,
        queue: &str,
        stage: LifecycleStage,
    ) -> Result<Vec<Task>, DashboardError> {
        let conn = self.lease(session_id).await?;

        let ids = conn
            .call(Command::lrange(&self.keys.stage(queue, stage), 0, -1))
            .await?
            .into_strings()
            .ok_or_else(|| StoreError::unexpected("LRANGE"))?;

        let records = join_all(
            ids.iter()
                .map(|id| conn.call(Command::hgetall(&self.keys.task(queue, id)))),
        )
        .await;

        let mut tasks = Vec::with_capacity(ids.len());
        for (id, record) in ids.into_iter().zip(records) {
            match record {
                Ok(reply) => {
                    if let Some(task) = task_from_reply(id, reply) {
                        tasks.push(task);
                    }
                }
                Err(e) if e.is_transport() => return Err(e.into()),
                Err(e) => debug!("skipping task {id} in {queue}:{stage}: {e}"),
            }
        }

        Ok(tasks)
    }

    /// A single task record, `None` when it does not exist.
    pub async fn task(&self, session_id: &str, queue: &str, task_id: &str) -> Result<Option<Task>, DashboardError> {
        let conn = self.lease(session_id).await?;

        let reply = conn.call(Command::hgetall(&self.keys.task(queue, task_id))).await?;
        Ok(task_from_reply(task_id.to_string(), reply))
    }
}

// -----------------------------------------------------------------------------
// ----- Dashboard: Private ----------------------------------------------------

impl<K: Connector> Dashboard<K> {
    async fn lease(&self, session_id: &str) -> Result<ConnectionLease<K::Client>, DashboardError> {
        self.registry
            .acquire(session_id)
            .await
            .ok_or(DashboardError::NotConnected)
    }

    /// Incremental SCAN until the cursor wraps. SCAN may repeat keys, so the
    /// result is deduplicated.
    async fn scan_namespace(
        &self,
        conn: &ConnectionLease<K::Client>,
        queue: &str,
    ) -> Result<Vec<String>, DashboardError> {
        let pattern = self.keys.namespace_pattern(queue);
        let mut seen = HashSet::new();
        let mut cursor = 0;

        loop {
            let (next, page) = conn
                .call(Command::scan(cursor, &pattern, self.scan_count))
                .await?
                .into_scan_page()
                .ok_or_else(|| StoreError::unexpected("SCAN"))?;

            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(seen.into_iter().collect())
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

pub fn bytes_to_mb(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

/// Integer replies pass through; anything else the store says about this one
/// key becomes 0. Losing the connection still fails the whole call.
fn count_or_zero(reply: Result<Reply, StoreError>, what: &str) -> Result<u64, DashboardError> {
    match reply {
        Ok(reply) => Ok(reply
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_else(|| {
                debug!("{what}: non-numeric reply, counting 0");
                0
            })),
        Err(e) if e.is_transport() => Err(e.into()),
        Err(e) => {
            debug!("{what}: {e}, counting 0");
            Ok(0)
        }
    }
}

fn task_from_reply(task_id: String, reply: Reply) -> Option<Task> {
    reply
        .into_map()
        .and_then(|fields| Task::from_fields(task_id, fields))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
