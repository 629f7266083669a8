#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use cppqd::wire::{Command, Reply};
use cppqd::{Connector, Endpoint, StoreClient, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// -----------------------------------------------------------------------------
// ----- MemoryKeyspace --------------------------------------------------------

/// Just enough of a key-value store for the commands the dashboard issues.
#[derive(Clone, Default)]
pub struct MemoryKeyspace {
    inner: Arc<Mutex<Data>>,
}

#[derive(Default)]
struct Data {
    lists: HashMap<String, Vec<String>>,
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    sizes: HashMap<String, i64>,
    unsized_keys: HashSet<String>,
}

const DEFAULT_KEY_SIZE: i64 = 64;

impl MemoryKeyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, key: &str, items: &[&str]) {
        let mut data = self.inner.lock();
        let list = data.lists.entry(key.to_string()).or_default();
        list.extend(items.iter().map(|s| s.to_string()));
    }

    pub fn add_member(&self, key: &str, member: &str) {
        self.inner
            .lock()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
    }

    pub fn has_member(&self, key: &str, member: &str) -> bool {
        self.inner
            .lock()
            .sets
            .get(key)
            .is_some_and(|set| set.contains(member))
    }

    pub fn set_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let map = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.inner.lock().hashes.insert(key.to_string(), map);
    }

    /// What MEMORY USAGE reports for `key`.
    pub fn set_size(&self, key: &str, bytes: i64) {
        self.inner.lock().sizes.insert(key.to_string(), bytes);
    }

    /// MEMORY USAGE on `key` answers with an error from now on.
    pub fn fail_memory_usage(&self, key: &str) {
        self.inner.lock().unsized_keys.insert(key.to_string());
    }

    pub fn execute(&self, args: &[Bytes]) -> Reply {
        let Some((name, rest)) = args.split_first() else {
            return Reply::Error("ERR empty command".into());
        };
        let name = String::from_utf8_lossy(name).to_ascii_uppercase();
        let rest: Vec<String> = rest
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();

        let mut data = self.inner.lock();
        match (name.as_str(), rest.as_slice()) {
            ("PING", _) => Reply::Status("PONG".into()),
            ("QUIT" | "AUTH" | "SELECT", _) => Reply::Status("OK".into()),

            ("LLEN", [key]) => {
                if data.sets.contains_key(key) || data.hashes.contains_key(key) {
                    return wrong_type();
                }
                Reply::Integer(data.lists.get(key).map_or(0, |l| l.len() as i64))
            }

            ("LRANGE", [key, start, stop]) => {
                let list = data.lists.get(key).cloned().unwrap_or_default();
                let (Ok(start), Ok(stop)) = (start.parse::<i64>(), stop.parse::<i64>()) else {
                    return Reply::Error("ERR value is not an integer".into());
                };
                bulk_array(slice(&list, start, stop))
            }

            ("SMEMBERS", [key]) => bulk_array(data.sets.get(key).into_iter().flatten().cloned()),

            ("SISMEMBER", [key, member]) => {
                Reply::Integer(data.sets.get(key).is_some_and(|s| s.contains(member)) as i64)
            }

            ("SADD", [key, member]) => {
                Reply::Integer(data.sets.entry(key.clone()).or_default().insert(member.clone()) as i64)
            }

            ("SREM", [key, member]) => {
                let removed = data.sets.get_mut(key).is_some_and(|s| s.remove(member));
                if data.sets.get(key).is_some_and(|s| s.is_empty()) {
                    data.sets.remove(key);
                }
                Reply::Integer(removed as i64)
            }

            ("HGETALL", [key]) => {
                if data.lists.contains_key(key) {
                    return wrong_type();
                }
                let fields = data.hashes.get(key).cloned().unwrap_or_default();
                bulk_array(fields.into_iter().flat_map(|(k, v)| [k, v]))
            }

            ("SCAN", [cursor, _, pattern, _, count]) => {
                let (Ok(cursor), Ok(count)) = (cursor.parse::<usize>(), count.parse::<usize>()) else {
                    return Reply::Error("ERR invalid cursor".into());
                };

                let keys = data.keys();
                let end = (cursor + count).min(keys.len());
                let page = keys
                    .get(cursor..end)
                    .unwrap_or_default()
                    .iter()
                    .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
                    .cloned();
                let next = if end >= keys.len() { 0 } else { end };

                Reply::Array(Some(vec![
                    Reply::Bulk(Some(Bytes::from(next.to_string()))),
                    bulk_array(page),
                ]))
            }

            ("MEMORY", [sub, key]) if sub.eq_ignore_ascii_case("USAGE") => {
                if data.unsized_keys.contains(key) {
                    return Reply::Error("ERR MEMORY USAGE is disabled for this key".into());
                }
                if !data.keys().contains(key) {
                    return Reply::Bulk(None);
                }
                Reply::Integer(data.sizes.get(key).copied().unwrap_or(DEFAULT_KEY_SIZE))
            }

            _ => Reply::Error(format!("ERR unknown command '{name}'")),
        }
    }
}

impl Data {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lists
            .keys()
            .chain(self.sets.keys())
            .chain(self.hashes.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

fn wrong_type() -> Reply {
    Reply::Error("WRONGTYPE Operation against a key holding the wrong kind of value".into())
}

fn bulk_array(items: impl IntoIterator<Item = String>) -> Reply {
    Reply::Array(Some(
        items
            .into_iter()
            .map(|s| Reply::Bulk(Some(Bytes::from(s))))
            .collect(),
    ))
}

fn slice(list: &[String], start: i64, stop: i64) -> Vec<String> {
    let len = list.len() as i64;
    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
    let (start, stop) = (norm(start), norm(stop).min(len - 1));
    if len == 0 || start > stop {
        return Vec::new();
    }
    list[start as usize..=stop as usize].to_vec()
}

fn glob_match(pattern: &[u8], key: &[u8]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((b'*', rest)) => (0..=key.len()).any(|i| glob_match(rest, &key[i..])),
        Some((b'?', rest)) => !key.is_empty() && glob_match(rest, &key[1..]),
        Some((b'\\', rest)) if !rest.is_empty() => {
            key.first() == Some(&rest[0]) && glob_match(&rest[1..], &key[1..])
        }
        Some((c, rest)) => key.first() == Some(c) && glob_match(rest, &key[1..]),
    }
}

// -----------------------------------------------------------------------------
// ----- MemoryConnector -------------------------------------------------------

/// Connector whose clients share one in-memory keyspace. Every client it
/// hands out stays observable through `clients()`.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    inner: Arc<ConnectorState>,
}

#[derive(Default)]
struct ConnectorState {
    keyspace: MemoryKeyspace,
    clients: Mutex<Vec<Arc<ClientState>>>,
    fail_open: AtomicBool,
    fail_ping: AtomicBool,
    open_delay: Mutex<Option<Duration>>,
}

impl MemoryConnector {
    pub fn new(keyspace: MemoryKeyspace) -> Self {
        Self {
            inner: Arc::new(ConnectorState {
                keyspace,
                ..Default::default()
            }),
        }
    }

    pub fn keyspace(&self) -> &MemoryKeyspace {
        &self.inner.keyspace
    }

    pub fn clients(&self) -> Vec<Arc<ClientState>> {
        self.inner.clients.lock().clone()
    }

    pub fn last_client(&self) -> Arc<ClientState> {
        self.clients().pop().expect("no client created yet")
    }

    pub fn fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ping(&self, fail: bool) {
        self.inner.fail_ping.store(fail, Ordering::SeqCst);
    }

    pub fn delay_open(&self, delay: Duration) {
        *self.inner.open_delay.lock() = Some(delay);
    }
}

impl Connector for MemoryConnector {
    type Client = MemoryClient;

    fn client(&self, _session_id: &str, endpoint: &Endpoint) -> MemoryClient {
        let state = Arc::new(ClientState {
            endpoint: endpoint.expose().to_string(),
            ..Default::default()
        });
        self.inner.clients.lock().push(state.clone());

        MemoryClient {
            connector: self.inner.clone(),
            state,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- MemoryClient ----------------------------------------------------------

#[derive(Default)]
pub struct ClientState {
    pub endpoint: String,
    open: AtomicBool,
    ready: AtomicBool,
    fail_calls: AtomicBool,
    pub opens: AtomicUsize,
    pub pings: AtomicUsize,
    pub quits: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ClientState {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Simulate the server hanging up.
    pub fn drop_transport(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }

    /// Simulate a command timeout on a socket that is still up.
    pub fn stall(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Every command fails as if the connection died mid-flight.
    pub fn fail_calls(&self, fail: bool) {
        self.fail_calls.store(fail, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MemoryClient {
    connector: Arc<ConnectorState>,
    state: Arc<ClientState>,
}

impl StoreClient for MemoryClient {
    fn is_open(&self) -> bool {
        self.state.is_open()
    }

    fn is_ready(&self) -> bool {
        self.state.is_open() && self.state.is_ready()
    }

    async fn open(&self) -> Result<(), StoreError> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);

        let delay = *self.connector.open_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.connector.fail_open.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        self.state.open.store(true, Ordering::SeqCst);
        self.state.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if !self.state.is_open() {
            return Err(StoreError::Closed);
        }
        if self.connector.fail_ping.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_millis(10)));
        }

        self.state.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn call(&self, command: Command) -> Result<Reply, StoreError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if !self.state.is_open() || self.state.fail_calls.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }

        match self.connector.keyspace.execute(command.args()) {
            Reply::Error(message) => Err(StoreError::Server(message)),
            reply => Ok(reply),
        }
    }

    async fn quit(&self) -> Result<(), StoreError> {
        self.state.quits.fetch_add(1, Ordering::SeqCst);
        self.state.drop_transport();
        Ok(())
    }

    fn terminate(&self) {
        self.state.drop_transport();
    }
}

// -----------------------------------------------------------------------------
// ----- FakeRespServer --------------------------------------------------------

/// A TCP server speaking RESP2 over a `MemoryKeyspace`.
pub struct FakeRespServer {
    pub addr: SocketAddr,
    keyspace: MemoryKeyspace,
    seen: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accepted: Arc<AtomicUsize>,
    reply_delay: Arc<AtomicU64>,
    acceptor: JoinHandle<()>,
}

impl FakeRespServer {
    pub async fn start(keyspace: MemoryKeyspace) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let reply_delay = Arc::new(AtomicU64::new(0));

        let acceptor = tokio::spawn({
            let keyspace = keyspace.clone();
            let seen = seen.clone();
            let connections = connections.clone();
            let accepted = accepted.clone();
            let reply_delay = reply_delay.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let task = tokio::spawn(serve(
                        stream,
                        keyspace.clone(),
                        seen.clone(),
                        reply_delay.clone(),
                    ));
                    connections.lock().push(task);
                }
            }
        });

        Self {
            addr,
            keyspace,
            seen,
            connections,
            accepted,
            reply_delay,
            acceptor,
        }
    }

    pub fn uri(&self) -> String {
        format!("redis://{}", self.addr)
    }

    pub fn keyspace(&self) -> &MemoryKeyspace {
        &self.keyspace
    }

    /// Upper-cased command lines received so far, e.g. `"SELECT 2"`.
    pub fn commands(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Hold every reply back this long before writing it.
    pub fn delay_replies(&self, delay: Duration) {
        self.reply_delay.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Hang up on every open client connection.
    pub fn drop_connections(&self) {
        for task in self.connections.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for FakeRespServer {
    fn drop(&mut self) {
        self.acceptor.abort();
        self.drop_connections();
    }
}

async fn serve(
    mut stream: TcpStream,
    keyspace: MemoryKeyspace,
    seen: Arc<Mutex<Vec<String>>>,
    reply_delay: Arc<AtomicU64>,
) {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        match stream.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        while let Ok(Some((frame, used))) = Reply::decode(&buf) {
            let _ = buf.split_to(used);

            let args: Vec<Bytes> = match frame {
                Reply::Array(Some(items)) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Reply::Bulk(Some(b)) => Some(b),
                        _ => None,
                    })
                    .collect(),
                _ => return,
            };

            let line = args
                .iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            let is_quit = line.eq_ignore_ascii_case("QUIT");
            seen.lock().push(line.to_ascii_uppercase());

            let delay = reply_delay.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let mut out = Vec::new();
            encode(&keyspace.execute(&args), &mut out);
            if stream.write_all(&out).await.is_err() {
                return;
            }

            if is_quit {
                return;
            }
        }
    }
}

pub fn encode(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Status(s) => out.extend_from_slice(format!("+{s}\r\n").as_bytes()),
        Reply::Error(s) => out.extend_from_slice(format!("-{s}\r\n").as_bytes()),
        Reply::Integer(n) => out.extend_from_slice(format!(":{n}\r\n").as_bytes()),
        Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
        Reply::Bulk(Some(b)) => {
            out.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
            out.extend_from_slice(b);
            out.extend_from_slice(b"\r\n");
        }
        Reply::Array(None) => out.extend_from_slice(b"*-1\r\n"),
        Reply::Array(Some(items)) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode(item, out);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Helpers ---------------------------------------------------------------

pub const ENDPOINT: &str = "redis://127.0.0.1:6379";
pub const OTHER_ENDPOINT: &str = "redis://127.0.0.1:6380/1";

/// Seed one queue with the layout a cppq producer writes.
pub fn seed_queue(keyspace: &MemoryKeyspace, name: &str, priority: u32) {
    keyspace.add_member("cppq:queues", &format!("{name}:{priority}"));
}

pub fn seed_task(keyspace: &MemoryKeyspace, queue: &str, stage: &str, id: &str, task_type: &str) {
    keyspace.push_list(&format!("cppq:{queue}:{stage}"), &[id]);
    keyspace.set_hash(
        &format!("cppq:{queue}:task:{id}"),
        &[("type", task_type), ("payload", "{}"), ("maxRetry", "3"), ("retried", "0")],
    );
}
