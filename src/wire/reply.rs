use bytes::Bytes;
use std::collections::HashMap;
use std::str;

use super::error::WireError;
use super::utils::read_line;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const MAX_DEPTH: usize = 8;

/// Largest frame a reader will buffer, matching the server's default
/// `proto-max-bulk-len`.
pub const MAX_FRAME_LEN: usize = 512 * 1024 * 1024;

// -----------------------------------------------------------------------------
// ----- Reply -----------------------------------------------------------------

/// A decoded RESP2 reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Reply>>),
}

/// Outcome of walking a frame without building it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan {
    /// A whole frame of this many bytes sits at the front of the buffer.
    Complete(usize),
    /// The buffer must hold at least this many bytes before the frame can
    /// be complete.
    Needs(usize),
}

// -----------------------------------------------------------------------------
// ----- Reply: Static ---------------------------------------------------------

impl Reply {
    /// Decode one reply from the front of `buf`.
    ///
    /// Returns the reply and the number of bytes it occupied, or `None` when
    /// the frame is not complete yet. Nothing is consumed; the caller advances
    /// its buffer by the returned length.
    pub fn decode(buf: &[u8]) -> Result<Option<(Reply, usize)>, WireError> {
        decode_at(buf, 0, 0)
    }

    /// Find where the first frame in `buf` ends without allocating. Readers
    /// use it to decide when to call [`Reply::decode`], so a large reply
    /// arriving in many reads is built once.
    pub fn scan(buf: &[u8]) -> Result<Scan, WireError> {
        scan_at(buf, 0, 0)
    }
}

// -----------------------------------------------------------------------------
// ----- Reply: Public ---------------------------------------------------------

impl Reply {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            Reply::Bulk(Some(b)) => str::from_utf8(b).ok()?.parse().ok(),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Reply::Status(s) => Some(s),
            Reply::Bulk(Some(b)) => Some(String::from_utf8_lossy(&b).into_owned()),
            _ => None,
        }
    }

    /// Flat array of strings (SMEMBERS, LRANGE). A nil array reads as empty.
    pub fn into_strings(self) -> Option<Vec<String>> {
        match self {
            Reply::Array(None) => Some(Vec::new()),
            Reply::Array(Some(items)) => items.into_iter().map(Reply::into_string).collect(),
            _ => None,
        }
    }

    /// Field/value pairs (HGETALL).
    pub fn into_map(self) -> Option<HashMap<String, String>> {
        let flat = self.into_strings()?;
        if flat.len() % 2 != 0 {
            return None;
        }

        let mut map = HashMap::with_capacity(flat.len() / 2);
        let mut it = flat.into_iter();
        while let (Some(field), Some(value)) = (it.next(), it.next()) {
            map.insert(field, value);
        }

        Some(map)
    }

    /// `[cursor, [keys...]]` (SCAN).
    pub fn into_scan_page(self) -> Option<(u64, Vec<String>)> {
        let Reply::Array(Some(mut items)) = self else {
            return None;
        };
        if items.len() != 2 {
            return None;
        }

        let keys = items.pop()?.into_strings()?;
        let cursor = items.pop()?.as_integer()?;

        Some((u64::try_from(cursor).ok()?, keys))
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Decoder -----------------------------------------------------

fn decode_at(buf: &[u8], pos: usize, depth: usize) -> Result<Option<(Reply, usize)>, WireError> {
    if depth > MAX_DEPTH {
        return Err(WireError::TooDeep(MAX_DEPTH));
    }

    let Some(&tag) = buf.get(pos) else {
        return Ok(None);
    };
    let Some((line, next)) = read_line(buf, pos + 1) else {
        return Ok(None);
    };

    match tag {
        b'+' => Ok(Some((Reply::Status(lossy(line)), next))),
        b'-' => Ok(Some((Reply::Error(lossy(line)), next))),
        b':' => Ok(Some((Reply::Integer(parse_int(line)?), next))),

        b'$' => {
            let Some(len) = parse_len(line)? else {
                return Ok(Some((Reply::Bulk(None), next)));
            };

            let end = next + len;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(WireError::MissingTerminator);
            }

            let body = Bytes::copy_from_slice(&buf[next..end]);
            Ok(Some((Reply::Bulk(Some(body)), end + 2)))
        }

        b'*' => {
            let Some(len) = parse_len(line)? else {
                return Ok(Some((Reply::Array(None), next)));
            };

            // Cap the preallocation; the length is peer-controlled.
            let mut items = Vec::with_capacity(len.min(1024));
            let mut cursor = next;
            for _ in 0..len {
                let Some((item, after)) = decode_at(buf, cursor, depth + 1)? else {
                    return Ok(None);
                };
                items.push(item);
                cursor = after;
            }

            Ok(Some((Reply::Array(Some(items)), cursor)))
        }

        other => Err(WireError::UnexpectedTag(other)),
    }
}

fn scan_at(buf: &[u8], pos: usize, depth: usize) -> Result<Scan, WireError> {
    if depth > MAX_DEPTH {
        return Err(WireError::TooDeep(MAX_DEPTH));
    }

    let Some(&tag) = buf.get(pos) else {
        return Ok(Scan::Needs(pos + 1));
    };
    let Some((line, next)) = read_line(buf, pos + 1) else {
        return Ok(Scan::Needs(buf.len() + 1));
    };

    match tag {
        b'+' | b'-' => Ok(Scan::Complete(next)),
        b':' => parse_int(line).map(|_| Scan::Complete(next)),

        b'$' => match parse_len(line)? {
            None => Ok(Scan::Complete(next)),
            Some(len) => {
                let end = next.saturating_add(len).saturating_add(2);
                if buf.len() < end {
                    Ok(Scan::Needs(end))
                } else {
                    Ok(Scan::Complete(end))
                }
            }
        },

        b'*' => {
            let Some(len) = parse_len(line)? else {
                return Ok(Scan::Complete(next));
            };

            let mut cursor = next;
            for _ in 0..len {
                match scan_at(buf, cursor, depth + 1)? {
                    Scan::Complete(after) => cursor = after,
                    needs => return Ok(needs),
                }
            }
            Ok(Scan::Complete(cursor))
        }

        other => Err(WireError::UnexpectedTag(other)),
    }
}

#[inline]
fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

#[inline]
fn parse_int(line: &[u8]) -> Result<i64, WireError> {
    str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| WireError::InvalidInteger(lossy(line)))
}

/// `-1` is the nil marker; any other negative length is malformed.
#[inline]
fn parse_len(line: &[u8]) -> Result<Option<usize>, WireError> {
    match parse_int(line)? {
        -1 => Ok(None),
        n if n < 0 => Err(WireError::InvalidLength(n)),
        n => Ok(Some(n as usize)),
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
