//! A Docker-Engine-compatible HTTP daemon that drives the `nerdctl` command
//! pipeline.
//!
//! The daemon listens on a TCP address, a Unix domain socket, or a socket
//! inherited from the supervising process manager, as selected by a resolved
//! [`nerdctld_config::AddressSpec`]. Capability checks (`/_ping` and
//! `/{version}/version`) are answered directly. Container endpoints are
//! translated by the [`bridge`] into a fresh [`bridge::CommandInvocation`],
//! which seeds the global flags from the process-wide command defaults and is
//! then executed by an [`bridge::ActionPipeline`].
//!
//! ## Lifecycle
//!
//! 1. Subscribe to `SIGINT` and `SIGTERM`.
//! 2. Bind the listener (and notify the supervisor when socket activated).
//! 3. Serve connections until a signal arrives.
//! 4. Remove the Unix socket file, stop accepting, and drain in-flight
//!    connections within the configured budget.

pub mod api;
pub mod bridge;
mod process;
mod telemetry;
pub mod transport;

pub use process::{
    LaunchError, LifecycleSignalHandler, ShutdownError, ShutdownSignal, SystemShutdownSignal,
    run_daemon,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
