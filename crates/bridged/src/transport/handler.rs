//! Connection handling abstractions for the daemon listener.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use crate::guard::ClientKey;

/// An accepted connection and the identity of its peer.
#[derive(Debug)]
pub(crate) struct ConnectionStream {
    stream: UnixStream,
    client: ClientKey,
    read_deadline: Option<Instant>,
}

impl ConnectionStream {
    pub(crate) const fn new(stream: UnixStream, client: ClientKey) -> Self {
        Self {
            stream,
            client,
            read_deadline: None,
        }
    }

    /// Guard key derived when the connection was accepted.
    pub(crate) const fn client(&self) -> &ClientKey {
        &self.client
    }

    /// Applies per-connection I/O deadlines.
    ///
    /// The read deadline covers every read from now on, not each read
    /// separately; the write deadline applies per write.
    pub(crate) fn set_deadlines(&mut self, read: Duration, write: Duration) -> io::Result<()> {
        self.read_deadline = Some(Instant::now() + read);
        self.stream.set_read_timeout(Some(read))?;
        self.stream.set_write_timeout(Some(write))
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(deadline) = self.read_deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::from(io::ErrorKind::TimedOut));
            }
            self.stream.set_read_timeout(Some(remaining))?;
        }
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single admitted connection. Implementations should avoid
    /// panicking.
    fn handle(&self, stream: ConnectionStream);

    /// Answers a connection refused because every worker slot is taken.
    ///
    /// Runs on the accept thread, so implementations must not read from the
    /// stream. The default closes the connection silently.
    fn overloaded(&self, stream: ConnectionStream) {
        drop(stream);
    }
}
