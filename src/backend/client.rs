use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::{select, time};
use tracing::{debug, warn};

use super::BackendConnection;
use crate::errors::StoreError;
use crate::store::{Connector, Endpoint, StoreClient};
use crate::wire::{Command, Reply};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

// -----------------------------------------------------------------------------
// ----- RespConnector ---------------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct RespConnector {
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RespConnector {
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }
}

impl Default for RespConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_COMMAND_TIMEOUT)
    }
}

impl Connector for RespConnector {
    type Client = RespClient;

    fn client(&self, session_id: &str, endpoint: &Endpoint) -> RespClient {
        RespClient {
            session: session_id.to_string(),
            endpoint: endpoint.clone(),
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            link: Mutex::new(None),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- RespClient ------------------------------------------------------------

/// A pipelining RESP client. One driver task owns the socket; callers hand it
/// commands over a channel and wait on a oneshot for their reply, so several
/// commands from one caller can be in flight at once.
#[derive(Debug)]
pub struct RespClient {
    session: String,
    endpoint: Endpoint,
    connect_timeout: Duration,
    command_timeout: Duration,
    link: Mutex<Option<Link>>,
}

#[derive(Debug)]
struct Link {
    requests: mpsc::UnboundedSender<Request>,
    state: Arc<LinkState>,
    driver: JoinHandle<()>,
}

#[derive(Debug)]
struct LinkState {
    open: AtomicBool,
    ready: AtomicBool,
}

#[derive(Debug)]
struct Request {
    command: Command,
    reply: oneshot::Sender<Result<Reply, StoreError>>,
}

// -----------------------------------------------------------------------------
// ----- RespClient: StoreClient -----------------------------------------------

impl StoreClient for RespClient {
    fn is_open(&self) -> bool {
        self.state().is_some_and(|s| s.open.load(Ordering::Acquire))
    }

    fn is_ready(&self) -> bool {
        self.state()
            .is_some_and(|s| s.open.load(Ordering::Acquire) && s.ready.load(Ordering::Acquire))
    }

    async fn open(&self) -> Result<(), StoreError> {
        let endpoint = self.endpoint.parse()?;
        self.terminate();

        let handshake = async {
            let mut conn = BackendConnection::connect(&endpoint.host, endpoint.port).await?;
            conn.startup(&endpoint).await?;
            Ok::<_, StoreError>(conn)
        };
        let conn = time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| StoreError::Timeout(self.connect_timeout))??;

        let state = Arc::new(LinkState {
            open: AtomicBool::new(true),
            ready: AtomicBool::new(true),
        });
        let (requests, inbox) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(conn, inbox, state.clone(), self.session.clone()));

        *self.link.lock() = Some(Link {
            requests,
            state,
            driver,
        });

        debug!(
            "store connection opened to {} [session={}]",
            self.endpoint.redacted(),
            self.session
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.call(Command::ping()).await?;

        if let Some(state) = self.state() {
            state.ready.store(true, Ordering::Release);
        }
        Ok(())
    }

    async fn call(&self, command: Command) -> Result<Reply, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        let state = {
            let guard = self.link.lock();
            let link = guard.as_ref().ok_or(StoreError::Closed)?;
            link.requests
                .send(Request {
                    command,
                    reply: reply_tx,
                })
                .map_err(|_| StoreError::Closed)?;
            link.state.clone()
        };

        match time::timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(Ok(Reply::Error(message)))) => Err(StoreError::Server(message)),
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StoreError::Closed),
            Err(_) => {
                // The socket is still up but did not answer in time.
                state.ready.store(false, Ordering::Release);
                Err(StoreError::Timeout(self.command_timeout))
            }
        }
    }

    async fn quit(&self) -> Result<(), StoreError> {
        self.call(Command::quit()).await?;

        // Dropping the sender ends the driver once the server hangs up.
        if let Some(link) = self.link.lock().take() {
            link.state.mark_closed();
        }
        Ok(())
    }

    fn terminate(&self) {
        if let Some(link) = self.link.lock().take() {
            link.driver.abort();
            link.state.mark_closed();
        }
    }
}

// -----------------------------------------------------------------------------
// ----- RespClient: Private ---------------------------------------------------

impl RespClient {
    fn state(&self) -> Option<Arc<LinkState>> {
        self.link.lock().as_ref().map(|link| link.state.clone())
    }
}

impl LinkState {
    fn mark_closed(&self) {
        self.ready.store(false, Ordering::Release);
        self.open.store(false, Ordering::Release);
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Driver ------------------------------------------------------

async fn drive(
    mut conn: BackendConnection,
    mut inbox: mpsc::UnboundedReceiver<Request>,
    state: Arc<LinkState>,
    session: String,
) {
    let mut inflight: VecDeque<oneshot::Sender<Result<Reply, StoreError>>> = VecDeque::new();

    let failure = loop {
        select! {
            request = inbox.recv() => {
                let Some(Request { command, reply }) = request else {
                    break None;
                };

                if let Err(e) = conn.send(&command.to_bytes()).await {
                    let _ = reply.send(Err(StoreError::Closed));
                    break Some(StoreError::Io(e));
                }
                inflight.push_back(reply);
            }

            read = conn.read_reply() => {
                match read {
                    Ok(reply) => match inflight.pop_front() {
                        Some(waiter) => { let _ = waiter.send(Ok(reply)); }
                        None => break Some(StoreError::unexpected("<unsolicited>")),
                    },
                    Err(e) => break Some(e),
                }
            }
        }
    };

    state.mark_closed();
    for waiter in inflight {
        let _ = waiter.send(Err(StoreError::Closed));
    }

    match failure {
        None | Some(StoreError::Closed) => {
            debug!("store connection closed [session={session}]");
        }
        Some(e) => {
            warn!("store transport error [session={session}]: {e}");
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
