use bytes::{Buf, BytesMut};
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::errors::StoreError;
use crate::store::EndpointParts;
use crate::wire::{Command, MAX_FRAME_LEN, Reply, Scan, WireError};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const READ_CAPACITY_HINT: usize = 8192;

// -----------------------------------------------------------------------------
// ----- BackendConnection -----------------------------------------------------

#[derive(Debug)]
pub struct BackendConnection {
    stream: TcpStream,
    buffer: BytesMut,
}

// -----------------------------------------------------------------------------
// ----- BackendConnection: Static ---------------------------------------------

impl BackendConnection {
    pub async fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CAPACITY_HINT),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- BackendConnection: Public ---------------------------------------------

impl BackendConnection {
    pub async fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(data).await
    }

    pub async fn read(&mut self) -> std::io::Result<usize> {
        self.buffer.reserve(READ_CAPACITY_HINT);
        self.stream.read_buf(&mut self.buffer).await
    }

    /// Next complete reply from the socket. Cancel-safe: bytes already read
    /// stay buffered until a whole frame is available.
    pub async fn read_reply(&mut self) -> Result<Reply, StoreError> {
        loop {
            // Only build the reply once all of it is buffered.
            let needed = match Reply::scan(&self.buffer)? {
                Scan::Complete(_) => match Reply::decode(&self.buffer)? {
                    Some((reply, used)) => {
                        self.buffer.advance(used);
                        return Ok(reply);
                    }
                    None => self.buffer.len() + 1,
                },
                Scan::Needs(needed) => needed,
            };

            if needed > MAX_FRAME_LEN {
                return Err(WireError::FrameTooLarge(MAX_FRAME_LEN).into());
            }

            while self.buffer.len() < needed {
                if self.read().await? == 0 {
                    return Err(StoreError::Closed);
                }
            }
        }
    }

    /// One request/response exchange. Only valid while nothing is pipelined.
    pub async fn request(&mut self, command: &Command) -> Result<Reply, StoreError> {
        self.send(&command.to_bytes()).await?;

        match self.read_reply().await? {
            Reply::Error(message) => Err(StoreError::Server(message)),
            reply => Ok(reply),
        }
    }

    /// AUTH (when the endpoint carries a password), SELECT (for a non-zero
    /// database), then PING so the connection is known to answer.
    pub async fn startup(&mut self, endpoint: &EndpointParts) -> Result<(), StoreError> {
        if let Some(password) = endpoint.password.as_ref() {
            let auth = Command::auth(endpoint.username.as_deref(), password.expose_secret());
            self.request(&auth).await?;
        }

        if endpoint.db != 0 {
            self.request(&Command::select(endpoint.db)).await?;
        }

        match self.request(&Command::ping()).await? {
            Reply::Status(_) | Reply::Bulk(Some(_)) => Ok(()),
            _ => Err(StoreError::unexpected("PING")),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
