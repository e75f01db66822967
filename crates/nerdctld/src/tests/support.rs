//! Test doubles shared by the unit and behavioural suites.

use std::io;
use std::os::fd::OwnedFd;
use std::sync::{Mutex, mpsc};

use mockall::mock;

use crate::bridge::{ActionPipeline, CommandInvocation, CommandResult};
use crate::process::ShutdownSignal;
use crate::transport::ActivationSource;

/// Activation source handing out pre-bound descriptors.
#[derive(Debug, Default)]
pub struct FakeActivation {
    listeners: Vec<OwnedFd>,
    notifications: usize,
}

impl FakeActivation {
    /// Source offering no sockets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Source offering `listeners` in order.
    pub fn with_listeners(listeners: Vec<OwnedFd>) -> Self {
        Self {
            listeners,
            notifications: 0,
        }
    }

    /// Number of readiness notifications sent so far.
    pub const fn notifications(&self) -> usize {
        self.notifications
    }
}

impl ActivationSource for FakeActivation {
    fn take_listeners(&mut self) -> io::Result<Vec<OwnedFd>> {
        Ok(std::mem::take(&mut self.listeners))
    }

    fn notify_ready(&mut self) -> io::Result<()> {
        self.notifications += 1;
        Ok(())
    }
}

/// Pipeline returning a canned result and recording every invocation.
#[derive(Debug, Default)]
pub struct StubPipeline {
    result: CommandResult,
    calls: Mutex<Vec<CommandInvocation>>,
}

impl StubPipeline {
    /// Pipeline whose actions succeed with `output`.
    pub fn succeeding(output: &str) -> Self {
        Self::returning(CommandResult::success(output.as_bytes()))
    }

    /// Pipeline whose actions produce `result`.
    pub fn returning(result: CommandResult) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Argument vectors executed so far, in call order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.calls()
            .iter()
            .map(|invocation| invocation.argv().to_vec())
            .collect()
    }

    /// Invocations executed so far, in call order.
    pub fn calls(&self) -> Vec<CommandInvocation> {
        self.calls.lock().expect("stub pipeline lock").clone()
    }
}

impl ActionPipeline for StubPipeline {
    fn execute(&self, invocation: &CommandInvocation) -> CommandResult {
        self.calls
            .lock()
            .expect("stub pipeline lock")
            .push(invocation.clone());
        self.result.clone()
    }
}

mock! {
    pub Pipeline {}

    impl ActionPipeline for Pipeline {
        fn execute(&self, invocation: &CommandInvocation) -> CommandResult;
    }
}

/// Shutdown signal fed from a channel.
#[derive(Debug)]
pub struct ChannelSignal {
    receiver: mpsc::Receiver<i32>,
}

impl ShutdownSignal for ChannelSignal {
    fn wait(&mut self) -> Option<i32> {
        self.receiver.recv().ok()
    }
}

/// Signal source paired with the sender that delivers to it.
pub fn channel_signal() -> (mpsc::Sender<i32>, ChannelSignal) {
    let (sender, receiver) = mpsc::channel();
    (sender, ChannelSignal { receiver })
}
