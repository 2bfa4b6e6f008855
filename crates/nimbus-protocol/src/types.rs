//! Frame data model and handshake types.

use serde::{Deserialize, Serialize};

use crate::{CLIENT_LANG, CLIENT_NAME};

/// One decoded protocol unit: an incoming published message, or a
/// client-side template about to be published.
///
/// For a completed frame `payload.len() == length` always holds; a
/// partial frame carries the declared `length` with an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Subject the message was published to.
    pub subject: String,
    /// Subscription id correlating the message to a handler.
    pub sid: String,
    /// Subject to publish a reply to, when the sender expects one.
    pub reply_to: Option<String>,
    /// Declared payload length in bytes.
    pub length: usize,
    /// Payload bytes; exactly `length` of them once complete.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates an outbound frame; `length` tracks the payload.
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        Self {
            subject: subject.into(),
            sid: String::new(),
            reply_to: None,
            length: payload.len(),
            payload,
        }
    }

    /// Builder: set the reply-to subject.
    pub fn with_reply(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Payload interpreted as UTF-8, lossily.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A frame header was tokenized but its payload (and/or trailing
/// terminator) has not fully arrived.
///
/// `bytes` is the exact additional byte count required; `None` would
/// mean even the header line was incomplete, which the decoder treats
/// as an error instead, so in practice payload deficits always carry a
/// count. The holder must append that many bytes and resume the same
/// partial frame; it is never silently discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedMoreData {
    /// Exact byte deficit, when knowable.
    pub bytes: Option<usize>,
    /// Header fields decoded so far; payload empty.
    pub partial: Frame,
}

/// Successful decode outcome: a finished frame or a data deficit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The frame arrived whole.
    Complete(Frame),
    /// More bytes are required before the frame can be completed.
    Incomplete(NeedMoreData),
}

impl Decoded {
    /// True when the frame arrived whole.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// A discrete server-to-client protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// INFO greeting; the JSON payload is surfaced raw for the
    /// transport layer to parse.
    Info(String),
    /// Published message, possibly still awaiting payload bytes.
    Msg(Decoded),
    /// Message with a header block. Recognized and consumed so the
    /// stream stays aligned; the header block is left unparsed inside
    /// the payload.
    HMsg(Decoded),
    /// Server liveness probe; must be answered with PONG.
    Ping,
    /// Answer to a client PING.
    Pong,
    /// Acknowledgement in verbose mode.
    Ok,
    /// Server-reported error; fatal to the connection.
    Err(String),
}

/// An active subscription: what the client asked the server to route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subject pattern being subscribed to.
    pub subject: String,
    /// Correlation token unique per active subscription.
    pub sid: String,
    /// Optional queue group for load-balanced delivery.
    pub queue_group: Option<String>,
}

impl Subscription {
    /// Creates a subscription without a queue group.
    pub fn new(subject: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            sid: sid.into(),
            queue_group: None,
        }
    }

    /// Builder: set the queue group.
    pub fn with_queue_group(mut self, group: impl Into<String>) -> Self {
        self.queue_group = Some(group.into());
        self
    }
}

/// Fields of the INFO greeting the client acts on.
///
/// Parsed once per connection and consumed immediately to build the
/// CONNECT handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    /// Server-assigned identifier.
    #[serde(default)]
    pub server_id: String,
    /// Human-readable server name. Required.
    pub server_name: String,
    /// Present when the server requests signed authentication.
    #[serde(default)]
    pub nonce: Option<String>,
    /// Other servers in the cluster the client may connect to.
    #[serde(default)]
    pub connect_urls: Vec<String>,
    /// Largest payload the server accepts.
    #[serde(default)]
    pub max_payload: Option<usize>,
    /// Negotiated verbosity flag echoed back in CONNECT.
    #[serde(default)]
    pub verbose: bool,
}

impl ServerInfo {
    /// Parses the JSON body of an INFO line.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// JSON body of the CONNECT handshake line.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectOptions {
    /// Request +OK acknowledgements for each published message.
    pub verbose: bool,
    /// Request strict subject validation.
    pub pedantic: bool,
    /// Whether the client requires a TLS connection.
    pub tls_required: bool,
    /// Client name.
    pub name: String,
    /// Client implementation language.
    pub lang: String,
    /// Client version.
    pub version: String,
}

impl ConnectOptions {
    /// Builds the options echoed back for a given INFO greeting.
    pub fn for_server(info: &ServerInfo) -> Self {
        Self {
            verbose: info.verbose,
            pedantic: false,
            tls_required: false,
            name: CLIENT_NAME.to_string(),
            lang: CLIENT_LANG.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
