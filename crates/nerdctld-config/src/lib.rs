//! Shared configuration for the `nerdctld` daemon.
//!
//! The crate resolves the listening address from the process flags, derives
//! the logging settings, and loads the process-wide command defaults that seed
//! every command invocation. The resulting [`Config`] is immutable and passed
//! explicitly into the daemon bootstrap.

mod address;
mod command_defaults;
mod daemon;
mod defaults;
mod logging;

pub use address::{AddressError, AddressSpec, Transport};
pub use command_defaults::{CommandDefaults, CommandDefaultsError};
pub use daemon::{Config, ConfigError, DaemonArgs};
pub use defaults::{
    DEBUG_LOG_FILTER, DEFAULT_LOG_FILTER, DEFAULT_NERDCTL_PATH, DEFAULT_SHUTDOWN_TIMEOUT_MS,
    DEFAULT_SOCKET, SYSTEM_NERDCTL_TOML, default_nerdctl_toml,
};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
