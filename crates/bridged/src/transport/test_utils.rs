//! Test helpers for the transport module.

use std::io::Write;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
    mpsc::{self, Receiver, Sender},
};

use super::{ConnectionHandler, ConnectionStream};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds every admitted connection open until released, and answers
/// overloaded connections with a marker line.
pub(crate) struct BlockingHandler {
    release: Mutex<Receiver<()>>,
}

impl BlockingHandler {
    pub(crate) const BUSY_MARKER: &'static [u8] = b"busy\n";

    pub(crate) fn new() -> (Sender<()>, Arc<Self>) {
        let (sender, receiver) = mpsc::channel();
        let handler = Arc::new(Self {
            release: Mutex::new(receiver),
        });
        (sender, handler)
    }
}

impl ConnectionHandler for BlockingHandler {
    fn handle(&self, stream: ConnectionStream) {
        let receiver = self.release.lock().unwrap_or_else(PoisonError::into_inner);
        drop(receiver.recv());
        drop(stream);
    }

    fn overloaded(&self, mut stream: ConnectionStream) {
        drop(stream.write_all(Self::BUSY_MARKER));
    }
}
