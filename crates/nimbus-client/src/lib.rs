//! Client for NATS-style publish/subscribe servers.
//!
//! Builds on `nimbus-protocol` with the pieces that own state and I/O:
//! the subscription registry routing incoming messages to handlers, the
//! TCP session driving the decode loop and handshake, and the
//! interactive shell.

pub mod error;
pub mod registry;
pub mod repl;
pub mod session;

pub use error::{ClientError, ClientResult};
pub use registry::{Dispatch, DispatchContext, MessageHandler, SubscriptionRegistry};
pub use session::Session;
