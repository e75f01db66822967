//! Resolution of listening address strings into transport specifications.
//!
//! Addresses take the form `scheme://target`, where the scheme selects one of
//! three listening strategies: `tcp`, `unix`, or `fd` (an activation socket
//! inherited from a supervisor). A bare socket path is accepted only through
//! the separate socket fallback and is rewritten to `unix://<path>`.

use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

const SCHEME_SEPARATOR: &str = "://";

/// Listening strategy selected by an address scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    /// Raw TCP listener bound to `host:port`.
    Tcp,
    /// Unix domain socket bound to a filesystem path.
    Unix,
    /// Socket inherited from the supervising process manager.
    Fd,
}

impl Transport {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "tcp" => Some(Self::Tcp),
            "unix" => Some(Self::Unix),
            "fd" => Some(Self::Fd),
            _ => None,
        }
    }
}

/// Resolved listening address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpec {
    transport: Transport,
    target: String,
}

impl AddressSpec {
    /// Builds a TCP address from a `host:port` target.
    #[must_use]
    pub fn tcp(target: impl Into<String>) -> Self {
        Self {
            transport: Transport::Tcp,
            target: target.into(),
        }
    }

    /// Builds a Unix domain socket address.
    #[must_use]
    pub fn unix(path: impl Into<String>) -> Self {
        Self {
            transport: Transport::Unix,
            target: path.into(),
        }
    }

    /// Builds an activation address. The target is ignored by the listener.
    #[must_use]
    pub fn fd() -> Self {
        Self {
            transport: Transport::Fd,
            target: String::new(),
        }
    }

    /// Resolves the daemon address from the `--addr` and `--socket` values.
    ///
    /// An empty `address` falls back to `unix://<socket>` when a socket path
    /// is available.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidAddress`] when the effective address has
    /// no `scheme://` separator, [`AddressError::UnsupportedScheme`] for
    /// unknown schemes, and [`AddressError::MissingTarget`] when a `tcp` or
    /// `unix` address names no target.
    pub fn resolve(address: &str, socket: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        let socket = socket.trim();
        if address.is_empty() && !socket.is_empty() {
            return format!("unix{SCHEME_SEPARATOR}{socket}").parse();
        }
        address.parse()
    }

    /// Transport selected by the address scheme.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Raw target following the scheme separator.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Socket path when the address uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self.transport {
            Transport::Unix => Some(Utf8Path::new(&self.target)),
            Transport::Tcp | Transport::Fd => None,
        }
    }
}

impl fmt::Display for AddressSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}{SCHEME_SEPARATOR}{}",
            self.transport, self.target
        )
    }
}

impl FromStr for AddressSpec {
    type Err = AddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((scheme, target)) = input.split_once(SCHEME_SEPARATOR) else {
            return Err(AddressError::InvalidAddress {
                address: input.to_owned(),
            });
        };
        let transport =
            Transport::from_scheme(scheme).ok_or_else(|| AddressError::UnsupportedScheme {
                scheme: scheme.to_owned(),
                address: input.to_owned(),
            })?;
        match transport {
            Transport::Fd => Ok(Self::fd()),
            Transport::Tcp | Transport::Unix if target.is_empty() => {
                Err(AddressError::MissingTarget {
                    transport,
                    address: input.to_owned(),
                })
            }
            Transport::Tcp | Transport::Unix => Ok(Self {
                transport,
                target: target.to_owned(),
            }),
        }
    }
}

/// Errors raised while resolving a listening address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address lacked a `scheme://` separator.
    #[error("did you mean unix://{address}")]
    InvalidAddress {
        /// Address as supplied by the operator.
        address: String,
    },
    /// The scheme is not one of `tcp`, `unix`, or `fd`.
    #[error("addr {address} not supported (unknown scheme '{scheme}')")]
    UnsupportedScheme {
        /// Scheme that failed to match.
        scheme: String,
        /// Address as supplied by the operator.
        address: String,
    },
    /// A `tcp` or `unix` address named no target.
    #[error("{transport} address '{address}' has no target")]
    MissingTarget {
        /// Transport that requires a target.
        transport: Transport,
        /// Address as supplied by the operator.
        address: String,
    },
}

impl AddressError {
    /// Address the operator most likely intended, when one can be suggested.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidAddress { address } => Some(format!("unix{SCHEME_SEPARATOR}{address}")),
            Self::UnsupportedScheme { .. } | Self::MissingTarget { .. } => None,
        }
    }
}
