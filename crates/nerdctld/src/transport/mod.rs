//! Listening transports for the daemon API.
//!
//! A resolved [`AddressSpec`](nerdctld_config::AddressSpec) selects one of
//! three strategies: a TCP listener, a Unix domain socket whose file is removed
//! on shutdown, or a socket inherited from the supervising process manager.

mod activation;
mod errors;
mod listener;
mod socket_file;

pub use self::activation::{ActivationSource, SystemdActivation};
pub use self::errors::ListenerError;
pub use self::listener::{Accepted, ListenerFactory, ListenerHandle, Ownership, ServeListener};
pub use self::socket_file::SocketFile;

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
