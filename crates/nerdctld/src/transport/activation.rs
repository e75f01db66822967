//! Socket activation following the systemd `LISTEN_FDS` protocol.

use std::env;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use sd_notify::NotifyState;
use tracing::debug;

use super::LISTENER_TARGET;

const LISTEN_FDS_START: RawFd = 3;
const LISTEN_PID: &str = "LISTEN_PID";
const LISTEN_FDS: &str = "LISTEN_FDS";

/// Access to the sockets and readiness channel offered by a supervisor.
pub trait ActivationSource: Send {
    /// Takes ownership of the inherited listening descriptors, in order.
    ///
    /// Subsequent calls return an empty list.
    fn take_listeners(&mut self) -> io::Result<Vec<OwnedFd>>;

    /// Tells the supervisor the daemon is ready to serve.
    fn notify_ready(&mut self) -> io::Result<()>;
}

/// Activation source backed by the process environment.
#[derive(Debug, Default)]
pub struct SystemdActivation {
    taken: bool,
}

impl SystemdActivation {
    /// Builds a source reading `LISTEN_PID` and `LISTEN_FDS`.
    #[must_use]
    pub const fn new() -> Self {
        Self { taken: false }
    }
}

impl ActivationSource for SystemdActivation {
    fn take_listeners(&mut self) -> io::Result<Vec<OwnedFd>> {
        if self.taken {
            return Ok(Vec::new());
        }
        self.taken = true;
        let pid = env::var(LISTEN_PID).ok();
        let fds = env::var(LISTEN_FDS).ok();
        let count = inherited_count(pid.as_deref(), fds.as_deref(), std::process::id())?;
        debug!(
            target: LISTENER_TARGET,
            count,
            "collecting inherited activation sockets"
        );
        let mut listeners = Vec::with_capacity(count);
        for offset in 0..count {
            let offset = RawFd::try_from(offset).map_err(|_| invalid("LISTEN_FDS out of range"))?;
            let fd = LISTEN_FDS_START + offset;
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(io::Error::from)?;
            // SAFETY: the supervisor hands these descriptors to this process
            // exclusively, and `taken` guarantees they are wrapped only once.
            listeners.push(unsafe { OwnedFd::from_raw_fd(fd) });
        }
        Ok(listeners)
    }

    fn notify_ready(&mut self) -> io::Result<()> {
        sd_notify::notify(false, &[NotifyState::Ready])
    }
}

/// Number of descriptors passed to `own_pid`.
///
/// Missing variables or a `LISTEN_PID` naming another process yield zero.
fn inherited_count(pid: Option<&str>, fds: Option<&str>, own_pid: u32) -> io::Result<usize> {
    let Some(pid) = pid else {
        return Ok(0);
    };
    let pid: u32 = pid
        .trim()
        .parse()
        .map_err(|_| invalid("LISTEN_PID is not a process id"))?;
    if pid != own_pid {
        return Ok(0);
    }
    match fds {
        Some(fds) => fds
            .trim()
            .parse()
            .map_err(|_| invalid("LISTEN_FDS is not a descriptor count")),
        None => Ok(0),
    }
}

fn invalid(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 0)]
    #[case(Some("42"), Some("2"), 2)]
    #[case(Some(" 42 "), Some("1"), 1)]
    #[case(Some("41"), Some("2"), 0)]
    #[case(Some("42"), None, 0)]
    fn counts_descriptors_for_own_pid(
        #[case] pid: Option<&str>,
        #[case] fds: Option<&str>,
        #[case] expected: usize,
    ) {
        let count = inherited_count(pid, fds, 42).expect("count should parse");
        assert_eq!(count, expected);
    }

    #[rstest]
    #[case(Some("self"), Some("1"))]
    #[case(Some("42"), Some("many"))]
    fn rejects_malformed_variables(#[case] pid: Option<&str>, #[case] fds: Option<&str>) {
        let error = inherited_count(pid, fds, 42).expect_err("should reject");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
