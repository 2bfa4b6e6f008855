//! Subscription registry and message dispatch.
//!
//! Incoming messages are routed to handlers by sid. The registry is
//! mutated only from the session's sequential decode loop, so no
//! locking is involved; re-entrancy is still a concern because the
//! request/reply pattern unsubscribes a sid from within its own
//! handler. Dispatch therefore takes the handler out of the map before
//! invoking it and defers removals requested through the
//! [`DispatchContext`] until the handler has returned.

use std::collections::HashMap;

use tracing::debug;

use nimbus_protocol::{Frame, Subscription};

/// Handler attached 1:1 with a subscription for its entire lifetime.
///
/// Receives the completed frame and a context for queueing wire
/// effects; returns its response frame, which the caller decides
/// whether to publish.
pub type MessageHandler = Box<dyn FnMut(&Frame, &mut DispatchContext) -> Frame + Send>;

/// Effect queue handed to a handler while it runs.
///
/// Effects are applied by the registry (local removals) and the session
/// (wire writes) after the handler returns, which makes unsubscribing
/// the currently-dispatched sid safe.
#[derive(Debug, Default)]
pub struct DispatchContext {
    unsubscribes: Vec<String>,
    publishes: Vec<Frame>,
}

impl DispatchContext {
    /// Queues an unsubscribe, including of the sid being dispatched.
    pub fn unsubscribe(&mut self, sid: impl Into<String>) {
        self.unsubscribes.push(sid.into());
    }

    /// Queues a frame to publish once dispatch completes.
    pub fn publish(&mut self, frame: Frame) {
        self.publishes.push(frame);
    }
}

/// Outcome of dispatching one frame.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// The handler's response frame; `None` when no handler matched.
    pub response: Option<Frame>,
    /// Sids to unsubscribe on the wire (already removed locally).
    pub unsubscribes: Vec<String>,
    /// Frames to publish on the wire.
    pub publishes: Vec<Frame>,
}

/// Maps sids to their message handlers.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: HashMap<String, MessageHandler>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the subscription's sid. Re-subscribing
    /// an existing sid overwrites its handler (last write wins).
    pub fn subscribe(&mut self, subscription: &Subscription, handler: MessageHandler) {
        self.handlers.insert(subscription.sid.clone(), handler);
    }

    /// Removes the handler for `sid`. Removing an absent sid is a
    /// no-op.
    pub fn unsubscribe(&mut self, sid: &str) {
        self.handlers.remove(sid);
    }

    /// True when a handler is registered for `sid`.
    pub fn contains(&self, sid: &str) -> bool {
        self.handlers.contains_key(sid)
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no subscriptions are active.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Routes a completed frame to its handler.
    ///
    /// A frame whose sid has no handler is dropped after a debug log;
    /// message loss is acceptable wire behavior when delivery races an
    /// unsubscribe. The handler stays registered after dispatch unless
    /// it unsubscribed its own sid through the context.
    pub fn dispatch(&mut self, frame: &Frame) -> Dispatch {
        let Some(mut handler) = self.handlers.remove(&frame.sid) else {
            debug!(sid = %frame.sid, subject = %frame.subject, "no handler for message");
            return Dispatch::default();
        };

        let mut ctx = DispatchContext::default();
        let response = handler(frame, &mut ctx);

        let unsubscribed_self = ctx.unsubscribes.iter().any(|sid| *sid == frame.sid);
        for sid in &ctx.unsubscribes {
            if *sid != frame.sid {
                self.handlers.remove(sid);
            }
        }
        if !unsubscribed_self {
            self.handlers.insert(frame.sid.clone(), handler);
        }

        Dispatch {
            response: Some(response),
            unsubscribes: ctx.unsubscribes,
            publishes: ctx.publishes,
        }
    }
}
