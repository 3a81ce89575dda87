//! Peer identification for accepted connections.

use std::os::unix::net::UnixStream;

use crate::guard::ClientKey;

/// Derives the guard key from the peer's kernel-reported credentials.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(super) fn identify(stream: &UnixStream) -> ClientKey {
    use nix::sys::socket::{getsockopt, sockopt::PeerCredentials};
    use tracing::debug;

    match getsockopt(stream, PeerCredentials) {
        Ok(credentials) => ClientKey::User(credentials.uid()),
        Err(error) => {
            debug!(
                target: super::LISTENER_TARGET,
                error = %error,
                "peer credentials unavailable"
            );
            ClientKey::Unidentified
        }
    }
}

/// Peer credentials are only read on Linux; other peers share one bucket.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(super) fn identify(_stream: &UnixStream) -> ClientKey {
    ClientKey::Unidentified
}
