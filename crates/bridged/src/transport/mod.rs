//! Unix socket transport.
//!
//! The listener binds the configured socket path, applies its permission bits
//! and accepts connections on a background thread. Each admitted connection
//! runs on its own worker thread; once `max_connections` workers are busy,
//! further connections are answered through
//! [`ConnectionHandler::overloaded`] without being read.

mod admission;
mod errors;
mod handler;
mod listener;
mod peer;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{BlockingHandler, CountingHandler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
