//! Read a CRLF-terminated line from a byte slice.

use memchr::memmem;

// -----------------------------------------------------------------------------
// ----- read_line -------------------------------------------------------------

/// Find the CRLF-terminated line starting at `start`.
///
/// Returns the line **without** its terminator and the offset of the first
/// byte after the CRLF, or `None` if the terminator has not arrived yet.
#[inline]
pub fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let unread = buf.get(start..)?;
    let end = memmem::find(unread, b"\r\n")?;

    Some((&unread[..end], start + end + 2))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
