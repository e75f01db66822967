//! Process-wide defaults for the global flags of every command invocation.
//!
//! The values mirror the keys of `nerdctl.toml` and are layered as follows:
//!
//! 1. Built-in defaults
//! 2. The TOML file (a missing file is tolerated)
//! 3. `NERDCTL_*` environment variables (for example `NERDCTL_NAMESPACE`)
//!
//! They are loaded once at startup and never mutated afterwards.

use camino::{Utf8Path, Utf8PathBuf};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "NERDCTL_";

/// Defaults applied to the global flags of each command graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDefaults {
    /// Enables debug output of the command pipeline.
    pub debug: bool,
    /// Enables verbose debug output including containerd internals.
    pub debug_full: bool,
    /// containerd socket address.
    pub address: String,
    /// containerd namespace.
    pub namespace: String,
    /// containerd snapshotter.
    pub snapshotter: String,
    /// Directory holding CNI plugin binaries.
    pub cni_path: String,
    /// Directory holding CNI network configuration.
    pub cni_netconfpath: String,
    /// Root directory of the command pipeline's persistent state.
    pub data_root: String,
    /// Cgroup manager (`cgroupfs`, `systemd`, or `none`).
    pub cgroup_manager: String,
    /// Allows plain HTTP and unverified TLS registries.
    pub insecure_registry: bool,
    /// Directories searched for registry host configuration.
    pub hosts_dir: Vec<String>,
    /// Enables experimental features.
    pub experimental: bool,
    /// IP address substituted for the special `host-gateway` name.
    pub host_gateway_ip: String,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            debug: false,
            debug_full: false,
            address: "/run/containerd/containerd.sock".to_owned(),
            namespace: "default".to_owned(),
            snapshotter: "overlayfs".to_owned(),
            cni_path: "/opt/cni/bin".to_owned(),
            cni_netconfpath: "/etc/cni/net.d".to_owned(),
            data_root: "/var/lib/nerdctl".to_owned(),
            cgroup_manager: "systemd".to_owned(),
            insecure_registry: false,
            hosts_dir: vec![
                "/etc/containerd/certs.d".to_owned(),
                "/etc/docker/certs.d".to_owned(),
            ],
            experimental: true,
            host_gateway_ip: String::new(),
        }
    }
}

impl CommandDefaults {
    /// Loads the defaults from `path`, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`CommandDefaultsError`] when the file exists but cannot be
    /// parsed, or when an override has the wrong type.
    pub fn load(path: &Utf8Path) -> Result<Self, CommandDefaultsError> {
        Self::figment(path)
            .extract()
            .map_err(|source| CommandDefaultsError {
                path: path.to_path_buf(),
                source: Box::new(source),
            })
    }

    fn figment(path: &Utf8Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_std_path()))
            .merge(Env::prefixed(ENV_PREFIX))
    }
}

/// Raised when the defaults file or its overrides are malformed.
#[derive(Debug, Error)]
#[error("failed to load command defaults from '{path}': {source}")]
pub struct CommandDefaultsError {
    /// File the defaults were read from.
    pub path: Utf8PathBuf,
    /// Underlying figment error.
    #[source]
    pub source: Box<figment::Error>,
}
