//! Wire framing for NATS-style publish/subscribe servers.
//!
//! This crate turns a raw byte stream into discrete protocol frames and
//! turns client intents into wire-format byte sequences. Protocol lines
//! are ASCII and CRLF-terminated:
//!
//! ```text
//! server -> client   INFO <json>
//!                    MSG <subject> <sid> [reply-to] <#bytes>\r\n<payload>\r\n
//!                    PING / PONG / +OK / -ERR <text>
//! client -> server   CONNECT <json-options>
//!                    PUB <subject> [reply-to] <#bytes>\r\n<payload>\r\n
//!                    SUB <subject> [queue-group] <sid>
//!                    UNSUB <sid>
//! ```
//!
//! Decoding is partial-read aware: a `MSG` header whose payload has not
//! fully arrived yields [`Decoded::Incomplete`] with the exact byte
//! deficit, and [`decode::resume`] finishes the frame once the
//! transport has appended the missing bytes. The decoder never performs
//! I/O; the transport feeds a [`ReadBuffer`] and acts on the result.
//!
//! # Example
//!
//! ```rust
//! use nimbus_protocol::{decode, Decoded, ReadBuffer};
//!
//! let mut buf = ReadBuffer::from(&b"MSG greetings 7 5\r\nhello\r\n"[..]);
//! let decoded = decode::decode(&mut buf).unwrap();
//! match decoded {
//!     Decoded::Complete(frame) => assert_eq!(frame.payload, b"hello"),
//!     Decoded::Incomplete(_) => unreachable!(),
//! }
//! ```

mod cursor;
mod error;
mod types;

pub mod decode;
pub mod encode;

pub use cursor::ReadBuffer;
pub use error::{DecodeError, DecodeResult};
pub use types::{
    ConnectOptions, Decoded, Frame, NeedMoreData, ServerFrame, ServerInfo, Subscription,
};

/// Two-byte line terminator ending every protocol line and payload block.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Maximum accepted payload length in a frame header (8 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 8 * 1024 * 1024;

/// Client name advertised in the CONNECT handshake.
pub const CLIENT_NAME: &str = "nimbus";

/// Client language advertised in the CONNECT handshake.
pub const CLIENT_LANG: &str = "rust";
