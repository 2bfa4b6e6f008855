//! Client error types.

use std::fmt;

use nimbus_protocol::DecodeError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Connection to the server failed.
    Connection(String),
    /// IO error on the socket or terminal.
    Io(std::io::Error),
    /// Wire framing error; the stream is desynchronized.
    Protocol(DecodeError),
    /// INFO greeting could not be parsed.
    Info(String),
    /// Server-reported error (`-ERR`).
    Server(String),
    /// Server closed the connection.
    Closed,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Protocol(err) => write!(f, "protocol error: {}", err),
            Self::Info(msg) => write!(f, "error parsing info: {}", msg),
            Self::Server(msg) => write!(f, "server error: {}", msg),
            Self::Closed => write!(f, "connection closed by server"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<DecodeError> for ClientError {
    fn from(err: DecodeError) -> Self {
        Self::Protocol(err)
    }
}
