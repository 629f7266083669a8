use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- WireError -------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected reply tag: {0:#X}")]
    UnexpectedTag(u8),

    #[error("invalid integer in reply header: {0:?}")]
    InvalidInteger(String),

    #[error("invalid length in reply header: {0}")]
    InvalidLength(i64),

    #[error("bulk string not terminated by CRLF")]
    MissingTerminator,

    #[error("reply nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("reply larger than {0} bytes")]
    FrameTooLarge(usize),
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
