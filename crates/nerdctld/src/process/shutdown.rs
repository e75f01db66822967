use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::transport::SocketFile;

use super::PROCESS_TARGET;

static SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + 'static {
    /// Blocks until a shutdown signal arrives.
    ///
    /// Returns the signal number, or `None` when the source closed without
    /// delivering one.
    fn wait(&mut self) -> Option<i32>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The process already holds its signal subscription.
    #[error("signal handlers are already installed for this process")]
    AlreadyInstalled,
}

/// Subscription to `SIGINT` and `SIGTERM`.
///
/// Only one subscription may exist per process run.
pub struct SystemShutdownSignal {
    signals: Signals,
}

impl std::fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SystemShutdownSignal").finish_non_exhaustive()
    }
}

impl SystemShutdownSignal {
    /// Subscribes to the termination signals.
    ///
    /// Signals delivered after this call are queued until [`wait`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::AlreadyInstalled`] on a second call and
    /// [`ShutdownError::Install`] when registration fails.
    ///
    /// [`wait`]: ShutdownSignal::wait
    pub fn install() -> Result<Self, ShutdownError> {
        if SUBSCRIBED.swap(true, Ordering::SeqCst) {
            return Err(ShutdownError::AlreadyInstalled);
        }
        match Signals::new([SIGTERM, SIGINT]) {
            Ok(signals) => Ok(Self { signals }),
            Err(source) => {
                SUBSCRIBED.store(false, Ordering::SeqCst);
                Err(ShutdownError::Install { source })
            }
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&mut self) -> Option<i32> {
        self.signals.forever().next()
    }
}

/// Background thread turning a shutdown signal into cleanup and cancellation.
#[derive(Debug)]
pub struct LifecycleSignalHandler {
    thread: thread::JoinHandle<Option<i32>>,
}

impl LifecycleSignalHandler {
    /// Spawns the handler thread.
    ///
    /// When the signal arrives the thread removes `socket_file` (if any) and
    /// then cancels `shutdown`. A signal source that closes without a signal
    /// triggers the same sequence.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised when the thread cannot be spawned.
    pub fn spawn<S: ShutdownSignal>(
        mut signal: S,
        shutdown: CancellationToken,
        socket_file: Option<SocketFile>,
    ) -> io::Result<Self> {
        let thread = thread::Builder::new()
            .name(concat!(env!("CARGO_PKG_NAME"), "-signals").to_owned())
            .spawn(move || {
                let received = signal.wait();
                match received {
                    Some(signal) => info!(
                        target: PROCESS_TARGET,
                        signal,
                        "shutdown signal received"
                    ),
                    None => debug!(
                        target: PROCESS_TARGET,
                        "signal source closed; shutting down"
                    ),
                }
                if let Some(file) = socket_file {
                    file.remove();
                }
                shutdown.cancel();
                received
            })?;
        Ok(Self { thread })
    }

    /// Whether the handler has already run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the handler and returns the signal it observed.
    #[must_use]
    pub fn join(self) -> Option<i32> {
        self.thread.join().ok().flatten()
    }
}
