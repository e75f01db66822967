//! Binding listeners for each transport and handing them to the runtime.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::os::unix::net::UnixListener;

use nix::sys::socket::{AddressFamily, SockaddrLike, SockaddrStorage, getsockname};
use tracing::{debug, info};

use nerdctld_config::{AddressSpec, Transport};

use super::{ActivationSource, LISTENER_TARGET, ListenerError, SocketFile, SystemdActivation};

const ANY_IPV4_HOST: &str = "0.0.0.0";

/// Whether the process owns the listening descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by this process and closed when serving ends.
    Owned,
    /// Inherited from the supervisor; left open when serving ends.
    Borrowed,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

/// Bound listener that has not started serving yet.
#[derive(Debug)]
pub struct ListenerHandle {
    address: AddressSpec,
    kind: ListenerKind,
    ownership: Ownership,
    socket_file: Option<SocketFile>,
}

impl ListenerHandle {
    /// Address the handle was bound from.
    #[must_use]
    pub const fn address(&self) -> &AddressSpec {
        &self.address
    }

    /// Local TCP address, when listening on TCP.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }

    /// Whether the listener accepts Unix domain connections.
    #[must_use]
    pub const fn is_unix(&self) -> bool {
        matches!(self.kind, ListenerKind::Unix(_))
    }

    /// Socket file to remove on shutdown, for the `unix` transport.
    #[must_use]
    pub const fn socket_file(&self) -> Option<&SocketFile> {
        self.socket_file.as_ref()
    }

    /// Descriptor ownership.
    #[must_use]
    pub const fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Registers the listener with the tokio runtime.
    ///
    /// Must be called from within a runtime context. A borrowed descriptor is
    /// duplicated first and only the duplicate is registered, so the inherited
    /// descriptor stays open even when registration fails.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Duplicate`], [`ListenerError::NonBlocking`] or
    /// [`ListenerError::Register`] when the descriptor cannot be handed to the
    /// runtime.
    pub fn into_serving(self) -> Result<ServeListener, ListenerError> {
        let Self {
            address,
            kind,
            ownership,
            socket_file: _,
        } = self;
        let kind = match ownership {
            Ownership::Owned => kind,
            Ownership::Borrowed => duplicate_inherited(kind)?,
        };
        let kind = match kind {
            ListenerKind::Tcp(listener) => {
                listener
                    .set_nonblocking(true)
                    .map_err(|source| ListenerError::NonBlocking { source })?;
                ServeKind::Tcp(
                    tokio::net::TcpListener::from_std(listener)
                        .map_err(|source| ListenerError::Register { source })?,
                )
            }
            ListenerKind::Unix(listener) => {
                listener
                    .set_nonblocking(true)
                    .map_err(|source| ListenerError::NonBlocking { source })?;
                ServeKind::Unix(
                    tokio::net::UnixListener::from_std(listener)
                        .map_err(|source| ListenerError::Register { source })?,
                )
            }
        };
        Ok(ServeListener { address, kind })
    }
}

/// Detaches the inherited descriptor and returns a duplicate to serve from.
fn duplicate_inherited(kind: ListenerKind) -> Result<ListenerKind, ListenerError> {
    let (duplicate, inherited) = match kind {
        ListenerKind::Tcp(listener) => (
            listener.try_clone().map(ListenerKind::Tcp),
            listener.into_raw_fd(),
        ),
        ListenerKind::Unix(listener) => (
            listener.try_clone().map(ListenerKind::Unix),
            listener.into_raw_fd(),
        ),
    };
    debug!(
        target: LISTENER_TARGET,
        fd = inherited,
        "activation socket left open for supervisor"
    );
    duplicate.map_err(|source| ListenerError::Duplicate { source })
}

#[derive(Debug)]
enum ServeKind {
    Tcp(tokio::net::TcpListener),
    Unix(tokio::net::UnixListener),
}

/// Connection accepted by a [`ServeListener`].
#[derive(Debug)]
pub enum Accepted {
    /// TCP client connection.
    Tcp(tokio::net::TcpStream),
    /// Unix domain client connection.
    Unix(tokio::net::UnixStream),
}

/// Listener registered with the runtime and ready to accept connections.
#[derive(Debug)]
pub struct ServeListener {
    address: AddressSpec,
    kind: ServeKind,
}

impl ServeListener {
    /// Address the listener was bound from.
    #[must_use]
    pub const fn address(&self) -> &AddressSpec {
        &self.address
    }

    /// Waits for the next client connection.
    ///
    /// # Errors
    ///
    /// Propagates the accept error; callers decide whether to retry.
    pub async fn accept(&self) -> io::Result<Accepted> {
        match &self.kind {
            ServeKind::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Accepted::Tcp(stream))
            }
            ServeKind::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(Accepted::Unix(stream))
            }
        }
    }

    /// Stops listening and closes the served descriptor.
    ///
    /// For the `fd` transport this is the duplicate made by
    /// [`ListenerHandle::into_serving`]; the inherited descriptor is untouched.
    pub fn release(self) {
        let Self { address, kind } = self;
        drop(kind);
        debug!(
            target: LISTENER_TARGET,
            address = %address,
            "listener released"
        );
    }
}

/// Creates listeners for resolved addresses.
#[derive(Debug)]
pub struct ListenerFactory<A = SystemdActivation> {
    activation: A,
}

impl ListenerFactory<SystemdActivation> {
    /// Factory reading activation sockets from the process environment.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            activation: SystemdActivation::new(),
        }
    }
}

impl<A: ActivationSource> ListenerFactory<A> {
    /// Factory using the supplied activation source.
    pub const fn new(activation: A) -> Self {
        Self { activation }
    }

    /// Activation source, for inspection after binding.
    pub const fn activation(&self) -> &A {
        &self.activation
    }

    /// Binds a listener for `address`.
    ///
    /// For the `fd` transport the readiness notification is sent before the
    /// inherited socket is adopted, and only when a socket was passed.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] describing the failed resolution, bind, or
    /// activation step. Nothing is served when binding fails.
    pub fn bind(&mut self, address: &AddressSpec) -> Result<ListenerHandle, ListenerError> {
        let handle = match address.transport() {
            Transport::Tcp => ListenerHandle {
                address: address.clone(),
                kind: ListenerKind::Tcp(bind_tcp(address.target())?),
                ownership: Ownership::Owned,
                socket_file: None,
            },
            Transport::Unix => {
                let path = address.target();
                let listener =
                    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
                        path: path.to_owned(),
                        source,
                    })?;
                ListenerHandle {
                    address: address.clone(),
                    kind: ListenerKind::Unix(listener),
                    ownership: Ownership::Owned,
                    socket_file: Some(SocketFile::new(path)),
                }
            }
            Transport::Fd => ListenerHandle {
                address: address.clone(),
                kind: self.adopt_activation_socket()?,
                ownership: Ownership::Borrowed,
                socket_file: None,
            },
        };
        info!(
            target: LISTENER_TARGET,
            address = %address,
            "listener bound"
        );
        Ok(handle)
    }

    fn adopt_activation_socket(&mut self) -> Result<ListenerKind, ListenerError> {
        let mut inherited = self
            .activation
            .take_listeners()
            .map_err(|source| ListenerError::Activation { source })?
            .into_iter();
        let first = inherited
            .next()
            .ok_or(ListenerError::MissingActivationSocket)?;
        for extra in inherited {
            let fd = extra.into_raw_fd();
            debug!(
                target: LISTENER_TARGET,
                fd,
                "ignoring additional activation socket"
            );
        }
        self.activation
            .notify_ready()
            .map_err(|source| ListenerError::Notify { source })?;
        adopt(first)
    }
}

fn adopt(fd: OwnedFd) -> Result<ListenerKind, ListenerError> {
    let address = getsockname::<SockaddrStorage>(fd.as_raw_fd()).map_err(|errno| {
        ListenerError::Activation {
            source: io::Error::from(errno),
        }
    })?;
    match address.family() {
        Some(AddressFamily::Inet | AddressFamily::Inet6) => {
            Ok(ListenerKind::Tcp(TcpListener::from(fd)))
        }
        Some(AddressFamily::Unix) => Ok(ListenerKind::Unix(UnixListener::from(fd))),
        other => {
            let family = other.map_or_else(|| "unknown".to_owned(), |family| format!("{family:?}"));
            // The descriptor belongs to the supervisor.
            let _fd = fd.into_raw_fd();
            Err(ListenerError::UnsupportedActivationSocket { family })
        }
    }
}

fn bind_tcp(target: &str) -> Result<TcpListener, ListenerError> {
    let target = if target.starts_with(':') {
        format!("{ANY_IPV4_HOST}{target}")
    } else {
        target.to_owned()
    };
    let addr = target
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            target: target.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::ResolveEmpty {
            target: target.clone(),
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpStream;
    use std::os::unix::net::UnixStream;

    use camino::Utf8PathBuf;
    use nix::fcntl::{FcntlArg, fcntl};
    use rstest::{fixture, rstest};

    use crate::tests::support::FakeActivation;

    #[fixture]
    fn socket_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn unix_address(dir: &tempfile::TempDir, name: &str) -> AddressSpec {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf8 path");
        AddressSpec::unix(path.into_string())
    }

    #[test]
    fn binds_tcp_on_ephemeral_port() {
        let mut factory = ListenerFactory::system();
        let handle = factory
            .bind(&AddressSpec::tcp("127.0.0.1:0"))
            .expect("bind tcp");
        let addr = handle.local_addr().expect("tcp listener has an address");
        assert_ne!(addr.port(), 0);
        assert_eq!(handle.ownership(), Ownership::Owned);
        assert!(handle.socket_file().is_none());
        TcpStream::connect(addr).expect("client connects");
    }

    #[test]
    fn bare_port_binds_all_ipv4_interfaces() {
        let mut factory = ListenerFactory::system();
        let handle = factory.bind(&AddressSpec::tcp(":0")).expect("bind tcp");
        let addr = handle.local_addr().expect("tcp listener has an address");
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn tcp_port_in_use_fails_to_bind() {
        let reserved = TcpListener::bind("127.0.0.1:0").expect("reserve port");
        let port = reserved.local_addr().expect("local addr").port();
        let mut factory = ListenerFactory::system();
        let error = factory
            .bind(&AddressSpec::tcp(format!("127.0.0.1:{port}")))
            .expect_err("port already bound");
        assert!(matches!(error, ListenerError::BindTcp { .. }));
    }

    #[rstest]
    fn unix_bind_exposes_socket_file(socket_dir: tempfile::TempDir) {
        let address = unix_address(&socket_dir, "nerdctl.sock");
        let mut factory = ListenerFactory::system();
        let handle = factory.bind(&address).expect("bind unix");
        assert!(handle.is_unix());
        let file = handle.socket_file().expect("unix handle owns its path");
        assert_eq!(file.path().as_str(), address.target());
        UnixStream::connect(address.target()).expect("client connects");
    }

    #[rstest]
    fn unix_bind_does_not_replace_existing_file(socket_dir: tempfile::TempDir) {
        let address = unix_address(&socket_dir, "stale.sock");
        std::fs::write(address.target(), b"").expect("create stale file");
        let mut factory = ListenerFactory::system();
        let error = factory.bind(&address).expect_err("existing path is not removed");
        assert!(matches!(error, ListenerError::BindUnix { .. }));
        assert!(std::path::Path::new(address.target()).exists());
    }

    #[test]
    fn activation_without_sockets_fails_before_notifying() {
        let mut factory = ListenerFactory::new(FakeActivation::empty());
        let error = factory
            .bind(&AddressSpec::fd())
            .expect_err("no inherited socket");
        assert!(matches!(error, ListenerError::MissingActivationSocket));
        assert_eq!(factory.activation().notifications(), 0);
    }

    #[test]
    fn activation_adopts_first_socket_after_notifying() {
        let inherited = TcpListener::bind("127.0.0.1:0").expect("bind inherited");
        let addr = inherited.local_addr().expect("local addr");
        let mut factory = ListenerFactory::new(FakeActivation::with_listeners(vec![
            OwnedFd::from(inherited),
        ]));
        let handle = factory.bind(&AddressSpec::fd()).expect("adopt socket");
        assert_eq!(factory.activation().notifications(), 1);
        assert_eq!(handle.ownership(), Ownership::Borrowed);
        assert_eq!(handle.local_addr(), Some(addr));
        assert!(handle.socket_file().is_none());
    }

    #[tokio::test]
    async fn released_activation_socket_stays_open() {
        let inherited = TcpListener::bind("127.0.0.1:0").expect("bind inherited");
        let addr = inherited.local_addr().expect("local addr");
        let raw = inherited.as_raw_fd();
        let mut factory = ListenerFactory::new(FakeActivation::with_listeners(vec![
            OwnedFd::from(inherited),
        ]));
        let handle = factory.bind(&AddressSpec::fd()).expect("adopt socket");
        let serving = handle.into_serving().expect("register with runtime");
        serving.release();

        fcntl(raw, FcntlArg::F_GETFD).expect("inherited descriptor is still open");
        TcpStream::connect(addr).expect("inherited socket still listens");
    }

    #[rstest]
    fn activation_adopts_unix_sockets(socket_dir: tempfile::TempDir) {
        let path = socket_dir.path().join("activated.sock");
        let inherited = UnixListener::bind(&path).expect("bind inherited");
        let mut factory =
            ListenerFactory::new(FakeActivation::with_listeners(vec![OwnedFd::from(inherited)]));
        let handle = factory.bind(&AddressSpec::fd()).expect("adopt socket");
        assert!(handle.is_unix());
        assert!(handle.local_addr().is_none());
    }
}
