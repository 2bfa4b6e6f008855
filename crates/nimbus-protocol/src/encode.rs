//! Frame encoder.
//!
//! Pure, stateless builders mapping each client operation to its exact
//! wire bytes. No validation beyond structure: non-empty subjects and
//! terminator-free tokens are caller contracts.

use crate::types::{ConnectOptions, ServerInfo};
use crate::TERMINATOR;

/// `PUB <subject> [reply-to] <#bytes>\r\n<payload>\r\n`
pub fn publish(subject: &str, reply_to: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(subject.len() + payload.len() + 24);
    out.extend_from_slice(b"PUB ");
    out.extend_from_slice(subject.as_bytes());
    if let Some(reply_to) = reply_to {
        out.push(b' ');
        out.extend_from_slice(reply_to.as_bytes());
    }
    out.push(b' ');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(TERMINATOR);
    out.extend_from_slice(payload);
    out.extend_from_slice(TERMINATOR);
    out
}

/// `SUB <subject> [queue-group] <sid>\r\n`
pub fn subscribe(subject: &str, queue_group: Option<&str>, sid: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(subject.len() + sid.len() + 16);
    out.extend_from_slice(b"SUB ");
    out.extend_from_slice(subject.as_bytes());
    if let Some(group) = queue_group {
        out.push(b' ');
        out.extend_from_slice(group.as_bytes());
    }
    out.push(b' ');
    out.extend_from_slice(sid.as_bytes());
    out.extend_from_slice(TERMINATOR);
    out
}

/// `UNSUB <sid>\r\n`
pub fn unsubscribe(sid: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(sid.len() + 8);
    out.extend_from_slice(b"UNSUB ");
    out.extend_from_slice(sid.as_bytes());
    out.extend_from_slice(TERMINATOR);
    out
}

/// `CONNECT <json-options>\r\n`, echoing the verbosity negotiated from
/// the INFO greeting.
pub fn connect(info: &ServerInfo) -> Result<Vec<u8>, serde_json::Error> {
    let options = serde_json::to_vec(&ConnectOptions::for_server(info))?;
    let mut out = Vec::with_capacity(options.len() + 10);
    out.extend_from_slice(b"CONNECT ");
    out.extend_from_slice(&options);
    out.extend_from_slice(TERMINATOR);
    Ok(out)
}

/// `PING\r\n`
pub fn ping() -> Vec<u8> {
    b"PING\r\n".to_vec()
}

/// `PONG\r\n`
pub fn pong() -> Vec<u8> {
    b"PONG\r\n".to_vec()
}
