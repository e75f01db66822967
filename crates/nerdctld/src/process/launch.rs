//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use nerdctld_config::Config;

use crate::api;
use crate::bridge::{ActionPipeline, ExecPipeline, RequestBridge};
use crate::telemetry;
use crate::transport::{ActivationSource, ListenerError, ListenerFactory, SystemdActivation};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{LifecycleSignalHandler, ShutdownError, ShutdownSignal, SystemShutdownSignal};

const WORKER_THREAD_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "-worker");

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<A, F> {
    pub(crate) config: Config,
    pub(crate) listeners: ListenerFactory<A>,
    pub(crate) subscribe: F,
    pub(crate) pipeline: Arc<dyn ActionPipeline>,
}

/// Runs the daemon using the production collaborators.
///
/// Returns once a shutdown signal has been handled and in-flight connections
/// have drained.
///
/// # Errors
///
/// Returns [`LaunchError`] when any startup step fails; nothing is served in
/// that case.
pub fn run_daemon(config: Config) -> Result<(), LaunchError> {
    telemetry::initialise(config.logging())?;
    let pipeline: Arc<dyn ActionPipeline> = Arc::new(ExecPipeline::new(config.nerdctl_path()));
    let plan = LaunchPlan {
        config,
        listeners: ListenerFactory::<SystemdActivation>::system(),
        subscribe: SystemShutdownSignal::install,
        pipeline,
    };
    run_daemon_with(plan).inspect_err(|error| {
        error!(
            target: PROCESS_TARGET,
            error = %error,
            "daemon failed"
        );
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<A, F, S>(plan: LaunchPlan<A, F>) -> Result<(), LaunchError>
where
    A: ActivationSource,
    F: FnOnce() -> Result<S, ShutdownError>,
    S: ShutdownSignal,
{
    let LaunchPlan {
        config,
        mut listeners,
        subscribe,
        pipeline,
    } = plan;

    info!(
        target: PROCESS_TARGET,
        address = %config.address(),
        defaults = %config.defaults_path(),
        "starting daemon runtime"
    );
    let signal = subscribe()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(WORKER_THREAD_NAME)
        .build()
        .map_err(|source| LaunchError::Runtime { source })?;
    let handle = listeners.bind(config.address())?;
    let socket_file = handle.socket_file().cloned();
    let shutdown = CancellationToken::new();
    let _signal_handler =
        match LifecycleSignalHandler::spawn(signal, shutdown.clone(), socket_file.clone()) {
            Ok(handler) => handler,
            Err(source) => {
                if let Some(file) = &socket_file {
                    file.remove();
                }
                return Err(LaunchError::SignalThread { source });
            }
        };

    let bridge = Arc::new(RequestBridge::new(config.command_defaults(), pipeline));
    let router = api::router(bridge);
    let drain = config.shutdown_timeout();
    let served = runtime.block_on(async move {
        let listener = handle.into_serving()?;
        api::serve(listener, router, shutdown, drain).await;
        Ok::<(), ListenerError>(())
    });
    if let Some(file) = &socket_file {
        file.remove();
    }
    runtime.shutdown_timeout(drain);
    served?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
