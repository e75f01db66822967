//! Behavioural tests covering the daemon run from bind to shutdown.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use nerdctld_config::{AddressSpec, CommandDefaults, Config};

use crate::bridge::ActionPipeline;
use crate::process::launch::{LaunchPlan, run_daemon_with};
use crate::process::{LaunchError, ShutdownError};
use crate::tests::support::{FakeActivation, StubPipeline, channel_signal};
use crate::transport::{ListenerError, ListenerFactory};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct LifecycleWorld {
    dir: TempDir,
    pipeline: Arc<StubPipeline>,
    sender: Option<mpsc::Sender<i32>>,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    response: String,
}

impl LifecycleWorld {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            pipeline: Arc::new(StubPipeline::succeeding("4f0c1e9a\n")),
            sender: None,
            handle: None,
            result: None,
            response: String::new(),
        }
    }

    fn socket_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("nerdctl.sock")).expect("utf8 path")
    }

    fn start(&mut self) {
        let config = Config::new(
            AddressSpec::unix(self.socket_path().into_string()),
            CommandDefaults::default(),
        )
        .with_shutdown_timeout(Duration::from_secs(2));
        let (sender, signal) = channel_signal();
        let pipeline: Arc<dyn ActionPipeline> = self.pipeline.clone();
        self.sender = Some(sender);
        self.handle = Some(thread::spawn(move || {
            run_daemon_with(LaunchPlan {
                config,
                listeners: ListenerFactory::new(FakeActivation::empty()),
                subscribe: move || Ok::<_, ShutdownError>(signal),
                pipeline,
            })
        }));
    }

    fn wait_for_socket(&self) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while !self.socket_path().exists() {
            assert!(Instant::now() < deadline, "daemon socket never appeared");
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn exchange(&mut self, request: &str) {
        let mut stream = UnixStream::connect(self.socket_path()).expect("client connects");
        stream
            .set_read_timeout(Some(WAIT_TIMEOUT))
            .expect("set read timeout");
        stream
            .write_all(request.as_bytes())
            .expect("request is written");
        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .expect("response is read");
        self.response = response;
    }

    fn join(&mut self) -> &Result<(), LaunchError> {
        if let Some(handle) = self.handle.take() {
            let result = handle.join().expect("daemon thread panicked");
            self.result = Some(result);
        }
        self.result.as_ref().expect("daemon was started")
    }
}

#[fixture]
fn world() -> RefCell<LifecycleWorld> {
    RefCell::new(LifecycleWorld::new())
}

#[given("a daemon configured on a Unix socket")]
fn given_unix_daemon(world: &RefCell<LifecycleWorld>) {
    assert!(!world.borrow().socket_path().exists());
}

#[given("a daemon configured on a socket path that already exists")]
fn given_occupied_path(world: &RefCell<LifecycleWorld>) {
    std::fs::write(world.borrow().socket_path(), b"").expect("create file");
}

#[when("the daemon starts")]
fn when_daemon_starts(world: &RefCell<LifecycleWorld>) {
    let mut world = world.borrow_mut();
    world.start();
    world.wait_for_socket();
}

#[when("a client pings the daemon")]
fn when_client_pings(world: &RefCell<LifecycleWorld>) {
    world
        .borrow_mut()
        .exchange("GET /_ping HTTP/1.1\r\nHost: nerdctld\r\nConnection: close\r\n\r\n");
}

#[when("a client creates a container from \"{image}\"")]
fn when_client_creates(world: &RefCell<LifecycleWorld>, image: String) {
    let body = format!("{{\"Image\":\"{image}\"}}");
    let request = format!(
        "POST /v1.43/containers/create HTTP/1.1\r\nHost: nerdctld\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    world.borrow_mut().exchange(&request);
}

#[when("the shutdown signal is delivered")]
fn when_signal_delivered(world: &RefCell<LifecycleWorld>) {
    let world = world.borrow();
    world
        .sender
        .as_ref()
        .expect("daemon was started")
        .send(15)
        .expect("signal is delivered");
}

#[then("the response status is {status}")]
fn then_response_status(world: &RefCell<LifecycleWorld>, status: u16) {
    let world = world.borrow();
    assert!(
        world.response.starts_with(&format!("HTTP/1.1 {status} ")),
        "unexpected response: {}",
        world.response
    );
}

#[then("the response body ends with \"{suffix}\"")]
fn then_response_body(world: &RefCell<LifecycleWorld>, suffix: String) {
    let world = world.borrow();
    assert!(
        world.response.ends_with(&suffix),
        "unexpected response: {}",
        world.response
    );
}

#[then("the pipeline received the image \"{image}\"")]
fn then_pipeline_image(world: &RefCell<LifecycleWorld>, image: String) {
    let invocations = world.borrow().pipeline.invocations();
    let argv = invocations.last().expect("pipeline was invoked");
    assert!(argv.contains(&"create".to_owned()), "argv: {argv:?}");
    assert_eq!(argv.last(), Some(&image));
}

#[then("the daemon run succeeds")]
fn then_run_succeeds(world: &RefCell<LifecycleWorld>) {
    let mut world = world.borrow_mut();
    let result = world.join();
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

#[then("the daemon removed its socket file")]
fn then_socket_removed(world: &RefCell<LifecycleWorld>) {
    assert!(!world.borrow().socket_path().exists());
}

#[then("the daemon run fails to bind the listener")]
fn then_run_fails_to_bind(world: &RefCell<LifecycleWorld>) {
    let mut world = world.borrow_mut();
    let result = world.join();
    assert!(
        matches!(
            result,
            Err(LaunchError::Listener {
                source: ListenerError::BindUnix { .. }
            })
        ),
        "unexpected result: {result:?}"
    );
}

#[then("the existing socket path is left in place")]
fn then_existing_path_kept(world: &RefCell<LifecycleWorld>) {
    assert!(world.borrow().socket_path().exists());
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "The daemon serves until a shutdown signal arrives"
)]
fn serves_until_signal(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Container requests reach the pipeline over the socket"
)]
fn container_requests_reach_pipeline(world: RefCell<LifecycleWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "An occupied socket path aborts startup"
)]
fn occupied_socket_aborts(world: RefCell<LifecycleWorld>) {
    drop(world);
}
