//! Decoder error types.

use thiserror::Error;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors produced while decoding a frame.
///
/// Every variant means the byte stream can no longer be trusted to
/// align on frame boundaries: the caller should close the connection
/// rather than retry. A short buffer is not an error; it is reported
/// through [`crate::Decoded::Incomplete`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Header line missing its CRLF terminator (or carrying a bare LF).
    #[error("malformed line")]
    MalformedLine,

    /// Header line did not tokenize as a known frame.
    #[error("bad syntax")]
    BadSyntax,

    /// MSG header without a byte-count token.
    #[error("missing bytes specifier")]
    MissingLength,

    /// Byte-count token is not a non-negative integer.
    #[error("malformed bytes: {token}")]
    InvalidLength { token: String },

    /// First byte of the buffer does not start any known frame.
    #[error("unexpected command byte: {byte:#04x}")]
    UnknownCommand { byte: u8 },

    /// Declared payload length exceeds the accepted maximum.
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },
}
