//! TCP connection session.
//!
//! Owns the socket, the decode buffer, and the subscription registry,
//! and drives everything sequentially: one read refills the buffer,
//! then every completed frame is decoded and dispatched on the same
//! logical turn. A payload that has not fully arrived is held as a
//! pending partial frame and resumed once the missing bytes are read;
//! it is never discarded.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use nimbus_protocol::{
    decode, encode, Decoded, Frame, NeedMoreData, ReadBuffer, ServerFrame, ServerInfo,
    Subscription,
};

use crate::error::{ClientError, ClientResult};
use crate::registry::{MessageHandler, SubscriptionRegistry};

const READ_CHUNK: usize = 4096;

/// A frame whose header is decoded but whose payload is still short.
struct PendingFrame {
    partial: Frame,
    /// Came in as HMSG; completed frames are dropped, not dispatched.
    headered: bool,
    /// Exact byte count still required.
    deficit: usize,
}

/// A live connection to one server.
pub struct Session {
    stream: TcpStream,
    buf: ReadBuffer,
    registry: SubscriptionRegistry,
    pending: Option<PendingFrame>,
    next_sid: u64,
    server_name: Option<String>,
}

impl Session {
    /// Connects to the server. The INFO → CONNECT handshake happens on
    /// the first [`Session::pump`] once the greeting arrives.
    pub async fn connect(host: &str, port: u16) -> ClientResult<Self> {
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            ClientError::Connection(format!("failed to connect to {host}:{port}: {e}"))
        })?;
        debug!(host, port, "connected");
        Ok(Self {
            stream,
            buf: ReadBuffer::new(),
            registry: SubscriptionRegistry::new(),
            pending: None,
            next_sid: 1,
            server_name: None,
        })
    }

    /// One socket read followed by draining every completed frame.
    pub async fn pump(&mut self) -> ClientResult<()> {
        self.fill().await?;
        self.drain_frames().await
    }

    /// Appends one socket read to the decode buffer.
    ///
    /// This is the only await point safe to race against other futures
    /// (a single cancel-safe `read`); callers selecting on it should
    /// invoke [`Session::drain_frames`] afterwards, outside the race.
    pub async fn fill(&mut self) -> ClientResult<usize> {
        let size = match &self.pending {
            Some(pending) => pending.deficit.max(READ_CHUNK),
            None => READ_CHUNK,
        };
        let mut chunk = vec![0u8; size];
        let n = self.stream.read(&mut chunk).await?;
        if n == 0 {
            info!("connection closed by server");
            return Err(ClientError::Closed);
        }
        trace!(bytes = n, "read");
        self.buf.extend(&chunk[..n]);
        Ok(n)
    }

    /// Decodes and handles every frame completed by the buffered bytes.
    ///
    /// Returns once the buffer holds no complete header line and no
    /// resumable payload; the caller reads more and calls again.
    pub async fn drain_frames(&mut self) -> ClientResult<()> {
        loop {
            if let Some(pending) = self.pending.take() {
                match decode::resume(&mut self.buf, pending.partial) {
                    Decoded::Complete(frame) => {
                        if pending.headered {
                            debug!(subject = %frame.subject, "dropping headered message");
                        } else {
                            self.dispatch_frame(frame).await?;
                        }
                    }
                    Decoded::Incomplete(need) => {
                        self.store_pending(need, pending.headered);
                        return Ok(());
                    }
                }
                continue;
            }

            if !self.buf.has_line() {
                return Ok(());
            }

            match decode::decode_frame(&mut self.buf)? {
                ServerFrame::Info(json) => self.handshake(&json).await?,
                ServerFrame::Msg(Decoded::Complete(frame)) => self.dispatch_frame(frame).await?,
                ServerFrame::Msg(Decoded::Incomplete(need)) => {
                    self.store_pending(need, false);
                    return Ok(());
                }
                ServerFrame::HMsg(Decoded::Complete(frame)) => {
                    debug!(subject = %frame.subject, bytes = frame.length, "dropping headered message");
                }
                ServerFrame::HMsg(Decoded::Incomplete(need)) => {
                    self.store_pending(need, true);
                    return Ok(());
                }
                ServerFrame::Ping => {
                    trace!("PING");
                    self.send(&encode::pong()).await?;
                }
                ServerFrame::Pong => trace!("PONG"),
                ServerFrame::Ok => trace!("+OK"),
                ServerFrame::Err(text) => {
                    error!(error = %text, "server error");
                    return Err(ClientError::Server(text));
                }
            }
        }
    }

    /// Publishes a payload on a subject.
    pub async fn publish(&mut self, subject: &str, payload: &[u8]) -> ClientResult<()> {
        self.send(&encode::publish(subject, None, payload)).await
    }

    /// Publishes a frame, carrying its reply-to subject if set.
    pub async fn publish_frame(&mut self, frame: &Frame) -> ClientResult<()> {
        self.send(&encode::publish(
            &frame.subject,
            frame.reply_to.as_deref(),
            &frame.payload,
        ))
        .await
    }

    /// Subscribes to a subject and registers the handler under a fresh
    /// sid, which is returned.
    pub async fn subscribe(
        &mut self,
        subject: &str,
        queue_group: Option<&str>,
        handler: MessageHandler,
    ) -> ClientResult<String> {
        let sid = self.allocate_sid();
        let mut subscription = Subscription::new(subject, sid.clone());
        if let Some(group) = queue_group {
            subscription = subscription.with_queue_group(group);
        }
        self.registry.subscribe(&subscription, handler);
        self.send(&encode::subscribe(subject, queue_group, &sid))
            .await?;
        info!(subject, sid = %sid, "subscribed");
        Ok(sid)
    }

    /// Removes the handler and tells the server to stop routing the
    /// sid.
    pub async fn unsubscribe(&mut self, sid: &str) -> ClientResult<()> {
        self.registry.unsubscribe(sid);
        self.send(&encode::unsubscribe(sid)).await
    }

    /// Publishes `template` with its reply-to pointed at a fresh inbox
    /// subject carrying a single-use subscription: the handler
    /// unsubscribes itself before running, so it is invoked at most
    /// once.
    pub async fn request(
        &mut self,
        template: Frame,
        mut handler: impl FnMut(&Frame) -> Frame + Send + 'static,
    ) -> ClientResult<String> {
        let inbox = format!("_INBOX.{}", Uuid::new_v4().simple());
        let sid = self.allocate_sid();
        let own_sid = sid.clone();
        self.registry.subscribe(
            &Subscription::new(inbox.clone(), sid.clone()),
            Box::new(move |frame, ctx| {
                ctx.unsubscribe(own_sid.clone());
                handler(frame)
            }),
        );
        self.send(&encode::subscribe(&inbox, None, &sid)).await?;

        let mut message = template;
        message.reply_to = Some(inbox);
        self.publish_frame(&message).await?;
        Ok(sid)
    }

    /// Subscribes on `subject` as a responder: whenever a dispatched
    /// frame carries a reply-to, the handler's result is published
    /// there. Frames without a reply-to are handled with no outbound
    /// publish.
    pub async fn reply(
        &mut self,
        subject: &str,
        mut handler: impl FnMut(&Frame) -> Frame + Send + 'static,
    ) -> ClientResult<String> {
        let sid = self.allocate_sid();
        self.registry.subscribe(
            &Subscription::new(subject, sid.clone()),
            Box::new(move |frame, ctx| {
                let mut response = handler(frame);
                if let Some(reply_to) = frame.reply_to.as_deref() {
                    response.subject = reply_to.to_string();
                    ctx.publish(response.clone());
                }
                response
            }),
        );
        self.send(&encode::subscribe(subject, None, &sid)).await?;
        Ok(sid)
    }

    /// Sends a client-initiated PING.
    pub async fn ping(&mut self) -> ClientResult<()> {
        self.send(&encode::ping()).await
    }

    /// Name the server announced in its INFO greeting, once seen.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// The active subscriptions.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    async fn handshake(&mut self, json: &str) -> ClientResult<()> {
        let mut info = ServerInfo::parse(json).map_err(|e| ClientError::Info(e.to_string()))?;
        info!(server_name = %info.server_name, "server greeting");
        info.verbose = true;
        let connect = encode::connect(&info)
            .map_err(|e| ClientError::Connection(format!("failed to encode handshake: {e}")))?;
        self.server_name = Some(info.server_name);
        self.send(&connect).await
    }

    async fn dispatch_frame(&mut self, frame: Frame) -> ClientResult<()> {
        debug!(subject = %frame.subject, sid = %frame.sid, bytes = frame.length, "message");
        let outcome = self.registry.dispatch(&frame);
        for sid in &outcome.unsubscribes {
            self.send(&encode::unsubscribe(sid)).await?;
        }
        for response in &outcome.publishes {
            self.publish_frame(response).await?;
        }
        Ok(())
    }

    fn store_pending(&mut self, need: NeedMoreData, headered: bool) {
        let deficit = need.bytes.unwrap_or(1);
        trace!(deficit, "awaiting payload bytes");
        self.pending = Some(PendingFrame {
            partial: need.partial,
            headered,
            deficit,
        });
    }

    fn allocate_sid(&mut self) -> String {
        let sid = self.next_sid.to_string();
        self.next_sid += 1;
        sid
    }

    async fn send(&mut self, bytes: &[u8]) -> ClientResult<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
