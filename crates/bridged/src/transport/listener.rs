//! Listener implementation for the daemon's Unix socket.

use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use bridge_config::SocketSettings;
use tracing::{debug, info, warn};

use super::admission::ConnectionSlots;
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError, peer};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to the configured socket path.
#[derive(Debug)]
pub(crate) struct SocketListener {
    path: PathBuf,
    listener: UnixListener,
}

impl SocketListener {
    /// Binds the socket and applies its permission bits.
    ///
    /// A stale socket left by a previous run is removed; a live one, or a
    /// path that is not a socket, is an error.
    pub(crate) fn bind(settings: &SocketSettings) -> Result<Self, ListenerError> {
        let path = settings.path().as_std_path();
        let listener = bind_unix(path)?;
        let mode = settings.permissions().mode();
        if let Err(source) = fs::set_permissions(path, Permissions::from_mode(mode)) {
            cleanup_unix_socket(path);
            return Err(ListenerError::Permissions {
                path: path.display().to_string(),
                mode,
                source,
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    /// Starts accepting connections, serving at most `max_connections` at
    /// once.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        max_connections: usize,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        if let Err(error) = self.listener.set_nonblocking(true) {
            cleanup_unix_socket(&self.path);
            return Err(ListenerError::NonBlocking { source: error });
        }
        let shutdown_flag = Arc::clone(&shutdown);
        let slots = ConnectionSlots::new(max_connections);
        let worker_slots = slots.clone();
        let handle =
            thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler, &worker_slots));
        Ok(ListenerHandle {
            shutdown,
            slots,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    slots: ConnectionSlots,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits until no connection is being served, up to `timeout`.
    ///
    /// Returns whether the listener became idle in time.
    pub(crate) fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.slots.active() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(ACCEPT_BACKOFF);
        }
        true
    }

    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    slots: &ConnectionSlots,
) {
    info!(
        target: LISTENER_TARGET,
        path = %listener.path.display(),
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let Some(permit) = slots.try_acquire() else {
                    debug!(
                        target: LISTENER_TARGET,
                        client = %stream.client(),
                        "connection limit reached"
                    );
                    handler.overloaded(stream);
                    continue;
                };
                let handler = Arc::clone(handler);
                thread::spawn(move || {
                    let _permit = permit;
                    handler.handle(stream);
                });
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    cleanup_unix_socket(&listener.path);
}

fn accept_connection(listener: &SocketListener) -> Result<Option<ConnectionStream>, io::Error> {
    match listener.listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            let client = peer::identify(&stream);
            Ok(Some(ConnectionStream::new(stream, client)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(ListenerError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

fn cleanup_unix_socket(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path.display(),
            "failed to remove unix socket file"
        );
    }
}
