//! Dispatch of API requests onto the action pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use nerdctld_config::CommandDefaults;

use super::BRIDGE_TARGET;
use super::builder::build_invocation;
use super::errors::{BridgeError, DispatchError};
use super::invocation::CommandInvocation;
use super::pipeline::ActionPipeline;
use super::request::ApiRequest;

/// Turns API requests into actions.
///
/// The bridge holds only read-only collaborators, so one instance serves every
/// connection concurrently.
#[derive(Clone)]
pub struct RequestBridge {
    defaults: Arc<CommandDefaults>,
    pipeline: Arc<dyn ActionPipeline>,
}

impl std::fmt::Debug for RequestBridge {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RequestBridge")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl RequestBridge {
    /// Bridge using `defaults` for the global flags and `pipeline` for actions.
    #[must_use]
    pub fn new(defaults: Arc<CommandDefaults>, pipeline: Arc<dyn ActionPipeline>) -> Self {
        Self { defaults, pipeline }
    }

    /// Builds the invocation for `request` without running it.
    ///
    /// # Errors
    ///
    /// See [`build_invocation`].
    pub fn build(&self, request: &ApiRequest) -> Result<CommandInvocation, BridgeError> {
        build_invocation(request, &self.defaults)
    }

    /// Builds and runs the invocation, returning the action's output.
    ///
    /// The action runs on the blocking pool with no deadline.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the invocation cannot be built, the
    /// action fails, or its task is lost. Every failure is logged.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<Vec<u8>, DispatchError> {
        let operation = request.operation;
        let invocation = self.build(&request).map_err(|error| {
            error!(
                target: BRIDGE_TARGET,
                %operation,
                api_version = %request.api_version,
                error = %error,
                "rejected request"
            );
            DispatchError::from(error)
        })?;
        let request_id = invocation.context().request_id();
        info!(
            target: BRIDGE_TARGET,
            %request_id,
            %operation,
            api_version = invocation.context().api_version(),
            "dispatching action"
        );
        let started = Instant::now();
        let pipeline = Arc::clone(&self.pipeline);
        let result = tokio::task::spawn_blocking(move || pipeline.execute(&invocation))
            .await
            .map_err(|source| {
                error!(
                    target: BRIDGE_TARGET,
                    %request_id,
                    %operation,
                    error = %source,
                    "action task failed"
                );
                DispatchError::Join { source }
            })?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result.into_result() {
            Ok(output) => {
                info!(
                    target: BRIDGE_TARGET,
                    %request_id,
                    %operation,
                    elapsed_ms,
                    "action completed"
                );
                Ok(output)
            }
            Err(action) => {
                error!(
                    target: BRIDGE_TARGET,
                    %request_id,
                    %operation,
                    kind = %action.kind(),
                    elapsed_ms,
                    error = %action,
                    "action failed"
                );
                Err(DispatchError::Action(action))
            }
        }
    }
}
