//! Request dispatch.
//!
//! A client connects, sends one JSON request and receives one JSON response
//! terminated by a newline:
//!
//! ```json
//! {"command":"echo","parameters":{"message":"Hello World"},"auth_token_hash":"..."}
//! ```
//!
//! ```json
//! {"success":true,"command":"echo","returncode":0,"stdout":"Hello World\n","stderr":""}
//! ```
//!
//! Failures carry `success: false`, an `error` message and a snake_case
//! `code`. Two reserved commands, `__ping__` and `__introspect__`, are always
//! available and still pass through the guard.

mod frame;
mod handler;
mod introspect;
mod response;

pub(crate) use self::handler::DispatchConnectionHandler;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
