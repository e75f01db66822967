use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::config_dir;
#[cfg(unix)]
use libc::geteuid;

/// Socket path used when no `--addr` is supplied.
pub const DEFAULT_SOCKET: &str = "nerdctl.sock";

/// Log filter used when no explicit filter or `--debug` is given.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter selected by `--debug`.
pub const DEBUG_LOG_FILTER: &str = "debug";

/// Command-line program invoked for container actions.
pub const DEFAULT_NERDCTL_PATH: &str = "nerdctl";

/// Upper bound for draining in-flight connections after a shutdown signal.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 10_000;

/// System-wide `nerdctl.toml` location used for root.
pub const SYSTEM_NERDCTL_TOML: &str = "/etc/nerdctl/nerdctl.toml";

/// Default location of the `nerdctl.toml` defaults file.
///
/// Root reads the system-wide file; rootless users read the file below their
/// configuration directory.
#[must_use]
pub fn default_nerdctl_toml() -> Utf8PathBuf {
    #[cfg(unix)]
    {
        // SAFETY: `geteuid` has no preconditions and cannot fail.
        let euid = unsafe { geteuid() };
        if euid != 0
            && let Some(dir) = config_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        {
            return dir.join("nerdctl").join("nerdctl.toml");
        }
    }
    Utf8PathBuf::from(SYSTEM_NERDCTL_TOML)
}
