//! Test suites for the daemon.

mod lifecycle_behaviour;
pub(crate) mod support;
