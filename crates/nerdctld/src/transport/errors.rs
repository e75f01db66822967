//! Error types for listener binding and activation.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or adopting a listening socket.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP target could not be resolved.
    #[error("failed to resolve TCP address {target}: {source}")]
    Resolve {
        /// `host:port` target as configured.
        target: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no socket address.
    #[error("no TCP addresses resolved for {target}")]
    ResolveEmpty {
        /// `host:port` target as configured.
        target: String,
    },
    /// Binding the TCP listener failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the Unix listener failed, including when the path exists.
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Duplicating an inherited descriptor for serving failed.
    #[error("failed to duplicate activation socket: {source}")]
    Duplicate {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener into non-blocking mode failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The async runtime refused the listener.
    #[error("failed to register listener with the runtime: {source}")]
    Register {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The supervisor passed no listening socket.
    #[error("no activation socket was passed by the supervisor")]
    MissingActivationSocket,
    /// Collecting or inspecting inherited sockets failed.
    #[error("failed to adopt activation socket: {source}")]
    Activation {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The inherited socket is neither an inet nor a unix stream socket.
    #[error("activation socket has unsupported address family {family}")]
    UnsupportedActivationSocket {
        /// Address family reported by the kernel.
        family: String,
    },
    /// Sending the readiness notification failed.
    #[error("failed to notify supervisor readiness: {source}")]
    Notify {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
