//! Process flags and the immutable daemon configuration built from them.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

use crate::address::{AddressError, AddressSpec};
use crate::command_defaults::{CommandDefaults, CommandDefaultsError};
use crate::defaults::{
    DEFAULT_NERDCTL_PATH, DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_SOCKET, default_nerdctl_toml,
};
use crate::logging::{LogFormat, LogSettings};

/// Command-line flags accepted by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "nerdctld",
    about = "A nerdctl daemon to use nerdctl.",
    version,
    disable_help_subcommand = true
)]
pub struct DaemonArgs {
    /// Enables debug mode.
    #[arg(long, env = "NERDCTLD_DEBUG")]
    pub debug: bool,
    /// Listening address (`tcp://host:port`, `unix://path`, or `fd://`).
    #[arg(long, default_value = "", env = "NERDCTLD_ADDR")]
    pub addr: String,
    /// Location of the socket file, used when `--addr` is empty.
    #[arg(long, default_value = DEFAULT_SOCKET, env = "NERDCTLD_SOCKET")]
    pub socket: String,
    /// Log filter directive; overrides the level implied by `--debug`.
    #[arg(long, env = "NERDCTLD_LOG_FILTER")]
    pub log_filter: Option<String>,
    /// Log output format.
    #[arg(long, default_value_t = LogFormat::Compact, env = "NERDCTLD_LOG_FORMAT")]
    pub log_format: LogFormat,
    /// Path of the `nerdctl.toml` command defaults file.
    #[arg(long, env = "NERDCTL_TOML")]
    pub config_path: Option<Utf8PathBuf>,
    /// Program executed for container actions.
    #[arg(long, default_value = DEFAULT_NERDCTL_PATH, env = "NERDCTLD_NERDCTL_PATH")]
    pub nerdctl_path: Utf8PathBuf,
    /// Milliseconds to drain in-flight requests after a shutdown signal.
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_MS, env = "NERDCTLD_SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: u64,
}

/// Immutable daemon configuration constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    address: AddressSpec,
    logging: LogSettings,
    defaults_path: Utf8PathBuf,
    command_defaults: Arc<CommandDefaults>,
    nerdctl_path: Utf8PathBuf,
    shutdown_timeout: Duration,
}

impl Config {
    /// Resolves parsed flags into a configuration, loading the command
    /// defaults file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address cannot be resolved or the
    /// defaults file is malformed.
    pub fn from_args(args: DaemonArgs) -> Result<Self, ConfigError> {
        let address = AddressSpec::resolve(&args.addr, &args.socket)?;
        let defaults_path = args.config_path.unwrap_or_else(default_nerdctl_toml);
        let command_defaults = CommandDefaults::load(&defaults_path)?;
        Ok(Self {
            address,
            logging: LogSettings::from_flags(
                args.debug,
                args.log_filter.as_deref(),
                args.log_format,
            ),
            defaults_path,
            command_defaults: Arc::new(command_defaults),
            nerdctl_path: args.nerdctl_path,
            shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
        })
    }

    /// Builds a configuration from already-resolved parts.
    #[must_use]
    pub fn new(address: AddressSpec, command_defaults: CommandDefaults) -> Self {
        Self {
            address,
            logging: LogSettings::default(),
            defaults_path: default_nerdctl_toml(),
            command_defaults: Arc::new(command_defaults),
            nerdctl_path: Utf8PathBuf::from(DEFAULT_NERDCTL_PATH),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }

    /// Replaces the shutdown drain budget.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Listening address.
    #[must_use]
    pub const fn address(&self) -> &AddressSpec {
        &self.address
    }

    /// Logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LogSettings {
        &self.logging
    }

    /// File the command defaults were loaded from.
    #[must_use]
    pub fn defaults_path(&self) -> &Utf8Path {
        &self.defaults_path
    }

    /// Shared, read-only command defaults.
    #[must_use]
    pub fn command_defaults(&self) -> Arc<CommandDefaults> {
        Arc::clone(&self.command_defaults)
    }

    /// Program invoked for container actions.
    #[must_use]
    pub fn nerdctl_path(&self) -> &Utf8Path {
        &self.nerdctl_path
    }

    /// Drain budget applied after a shutdown signal.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

/// Errors raised while building the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The listening address could not be resolved.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// The command defaults file could not be loaded.
    #[error(transparent)]
    Defaults(#[from] CommandDefaultsError),
}
