//! Shared ownership of a bound Unix socket path.

use std::fs;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use super::LISTENER_TARGET;

/// Unix socket file shared between the serve path and the signal handler.
///
/// Every clone refers to the same path; the file is unlinked at most once.
#[derive(Debug, Clone)]
pub struct SocketFile {
    inner: Arc<SocketFileInner>,
}

#[derive(Debug)]
struct SocketFileInner {
    path: Utf8PathBuf,
    removed: AtomicBool,
}

impl SocketFile {
    /// Tracks the socket bound at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            inner: Arc::new(SocketFileInner {
                path: path.into(),
                removed: AtomicBool::new(false),
            }),
        }
    }

    /// Socket path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.inner.path
    }

    /// Whether removal has already been attempted.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.inner.removed.load(Ordering::SeqCst)
    }

    /// Unlinks the socket file.
    ///
    /// Returns `true` only for the call that performed the attempt. A missing
    /// file is not an error; other failures are logged and swallowed.
    pub fn remove(&self) -> bool {
        if self.inner.removed.swap(true, Ordering::SeqCst) {
            return false;
        }
        match fs::remove_file(self.path()) {
            Ok(()) => {
                debug!(
                    target: LISTENER_TARGET,
                    path = %self.path(),
                    "removed unix socket file"
                );
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    path = %self.path(),
                    error = %error,
                    "failed to remove unix socket file"
                );
            }
        }
        true
    }
}
