use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;
use std::borrow::Cow;

// -----------------------------------------------------------------------------
// ----- Command ---------------------------------------------------------------

/// A store command: the name followed by its arguments, sent as a RESP array
/// of bulk strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    args: SmallVec<[Bytes; 4]>,
}

// -----------------------------------------------------------------------------
// ----- Command: Static -------------------------------------------------------

impl Command {
    pub fn new(name: &'static str) -> Self {
        let mut args = SmallVec::new();
        args.push(Bytes::from_static(name.as_bytes()));
        Self { args }
    }

    pub fn ping() -> Self {
        Self::new("PING")
    }

    pub fn quit() -> Self {
        Self::new("QUIT")
    }

    pub fn auth(username: Option<&str>, password: &str) -> Self {
        let cmd = Self::new("AUTH");
        match username {
            Some(user) => cmd.arg(user).arg(password),
            None => cmd.arg(password),
        }
    }

    pub fn select(db: u32) -> Self {
        Self::new("SELECT").arg(db.to_string())
    }

    pub fn llen(key: &str) -> Self {
        Self::new("LLEN").arg(key)
    }

    pub fn lrange(key: &str, start: i64, stop: i64) -> Self {
        Self::new("LRANGE")
            .arg(key)
            .arg(start.to_string())
            .arg(stop.to_string())
    }

    pub fn smembers(key: &str) -> Self {
        Self::new("SMEMBERS").arg(key)
    }

    pub fn sismember(key: &str, member: &str) -> Self {
        Self::new("SISMEMBER").arg(key).arg(member)
    }

    pub fn sadd(key: &str, member: &str) -> Self {
        Self::new("SADD").arg(key).arg(member)
    }

    pub fn srem(key: &str, member: &str) -> Self {
        Self::new("SREM").arg(key).arg(member)
    }

    pub fn hgetall(key: &str) -> Self {
        Self::new("HGETALL").arg(key)
    }

    pub fn scan(cursor: u64, pattern: &str, count: u32) -> Self {
        Self::new("SCAN")
            .arg(cursor.to_string())
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count.to_string())
    }

    pub fn memory_usage(key: &str) -> Self {
        Self::new("MEMORY").arg("USAGE").arg(key)
    }
}

// -----------------------------------------------------------------------------
// ----- Command: Public -------------------------------------------------------

impl Command {
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.args[0])
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Build the RESP array frame. Returns a complete wire buffer.
    pub fn to_bytes(&self) -> Bytes {
        let body: usize = self.args.iter().map(|a| a.len() + 16).sum();
        let mut buf = BytesMut::with_capacity(16 + body);

        put_header(&mut buf, b'*', self.args.len());
        for arg in &self.args {
            put_header(&mut buf, b'$', arg.len());
            buf.extend_from_slice(arg);
            buf.put_slice(b"\r\n");
        }

        buf.freeze()
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

#[inline]
fn put_header(buf: &mut BytesMut, tag: u8, len: usize) {
    buf.put_u8(tag);
    buf.extend_from_slice(len.to_string().as_bytes());
    buf.put_slice(b"\r\n");
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
