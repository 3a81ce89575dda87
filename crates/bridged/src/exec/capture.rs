//! Bounded capture of child output streams.

use std::io::{self, Read};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

const CHUNK_SIZE: usize = 8 * 1024;

/// Byte budget shared by the stdout and stderr readers.
#[derive(Debug, Clone)]
pub(super) struct OutputBudget {
    remaining: Arc<AtomicUsize>,
}

impl OutputBudget {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            remaining: Arc::new(AtomicUsize::new(limit)),
        }
    }

    /// Reserves up to `wanted` bytes and returns how many were granted.
    fn reserve(&self, wanted: usize) -> usize {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                Some(remaining.saturating_sub(wanted))
            })
            .unwrap_or(0);
        previous.min(wanted)
    }
}

/// Bytes read from one stream.
#[derive(Debug, Default)]
pub(super) struct Captured {
    pub(super) bytes: Vec<u8>,
    pub(super) truncated: bool,
    /// Set when the stream was still open at the collection deadline.
    pub(super) abandoned: bool,
}

impl Captured {
    pub(super) fn into_text(self) -> (String, bool) {
        (
            String::from_utf8_lossy(&self.bytes).into_owned(),
            self.truncated,
        )
    }
}

/// Handle to a stream being read on a background thread.
pub(super) struct StreamReader {
    captured: Arc<Mutex<Captured>>,
    done: Receiver<()>,
}

impl StreamReader {
    /// Collects whatever the reader gathered by `deadline`.
    ///
    /// A reader still blocked at the deadline is left running against its
    /// own buffer; its partial output is returned and marked truncated.
    pub(super) fn finish(self, deadline: Instant) -> Captured {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let finished = !matches!(
            self.done.recv_timeout(remaining),
            Err(RecvTimeoutError::Timeout)
        );
        let mut captured = mem::take(&mut *lock(&self.captured));
        if !finished {
            captured.truncated = true;
            captured.abandoned = true;
        }
        captured
    }
}

/// Reads `stream` on a background thread until end of file.
///
/// Bytes beyond the budget are read and discarded so the child never blocks
/// on a full pipe.
pub(super) fn spawn_reader<R>(stream: Option<R>, budget: OutputBudget) -> StreamReader
where
    R: Read + Send + 'static,
{
    let captured = Arc::new(Mutex::new(Captured::default()));
    let (finished, done) = mpsc::channel::<()>();
    if let Some(mut reader) = stream {
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            capture(&mut reader, &budget, &sink);
            drop(finished);
        });
    }
    StreamReader { captured, done }
}

fn capture(reader: &mut impl Read, budget: &OutputBudget, sink: &Mutex<Captured>) {
    let mut chunk = vec![0_u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let granted = budget.reserve(read);
        let mut captured = lock(sink);
        if let Some(kept) = chunk.get(..granted) {
            captured.bytes.extend_from_slice(kept);
        }
        if granted < read {
            captured.truncated = true;
        }
    }
}

fn lock(captured: &Mutex<Captured>) -> MutexGuard<'_, Captured> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn capture_all(reader: &mut impl Read, budget: &OutputBudget) -> Captured {
        let sink = Mutex::new(Captured::default());
        capture(reader, budget, &sink);
        sink.into_inner().expect("sink lock")
    }

    /// Stays open for a few seconds, like a pipe held by a stray process.
    struct Lingering {
        reads: usize,
    }

    impl Read for Lingering {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_millis(10));
            self.reads += 1;
            if self.reads > 300 {
                return Ok(0);
            }
            let len = buf.len().min(2);
            buf.get_mut(..len).expect("length checked").fill(b'z');
            Ok(len)
        }
    }

    #[test]
    fn budget_is_shared_between_readers() {
        let budget = OutputBudget::new(10);
        let first = capture_all(&mut Cursor::new(vec![b'a'; 6]), &budget);
        let second = capture_all(&mut Cursor::new(vec![b'b'; 6]), &budget);

        assert_eq!(first.bytes.len(), 6);
        assert!(!first.truncated);
        assert_eq!(second.bytes, b"bbbb");
        assert!(second.truncated);
    }

    #[test]
    fn exhausted_budget_drains_the_stream() {
        let budget = OutputBudget::new(0);
        let mut stream = Cursor::new(vec![b'x'; CHUNK_SIZE * 3]);
        let captured = capture_all(&mut stream, &budget);

        assert!(captured.bytes.is_empty());
        assert!(captured.truncated);
        assert_eq!(stream.position(), u64::try_from(CHUNK_SIZE * 3).expect("fits"));
    }

    #[test]
    fn finished_readers_return_everything() {
        let reader = spawn_reader(Some(Cursor::new(b"done".to_vec())), OutputBudget::new(64));
        let captured = reader.finish(Instant::now() + Duration::from_secs(5));

        assert_eq!(captured.bytes, b"done");
        assert!(!captured.truncated);
        assert!(!captured.abandoned);
    }

    #[test]
    fn open_streams_are_abandoned_at_the_deadline() {
        let reader = spawn_reader(Some(Lingering { reads: 0 }), OutputBudget::new(64));
        let started = Instant::now();
        let captured = reader.finish(started + Duration::from_millis(200));

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(captured.abandoned);
        assert!(captured.truncated);
        assert!(captured.bytes.iter().all(|byte| *byte == b'z'));
    }

    #[test]
    fn missing_streams_finish_empty() {
        let captured = spawn_reader(None::<Cursor<Vec<u8>>>, OutputBudget::new(64))
            .finish(Instant::now() + Duration::from_secs(5));
        assert!(captured.bytes.is_empty());
        assert!(!captured.truncated);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let captured = Captured {
            bytes: vec![b'o', b'k', 0xff],
            ..Captured::default()
        };
        let (text, truncated) = captured.into_text();
        assert_eq!(text, "ok\u{fffd}");
        assert!(!truncated);
    }
}
