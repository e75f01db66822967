//! Errors raised while bridging a request to the command pipeline.

use thiserror::Error;
use tokio::task::JoinError;

use super::pipeline::ActionError;

/// Errors building an invocation from an API request.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request body is not valid JSON for the operation.
    #[error("invalid request body: {source}")]
    InvalidBody {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// A required body field was absent or empty.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Body field name as spelled by the API.
        field: &'static str,
    },
    /// A required path parameter was absent.
    #[error("missing path parameter '{name}'")]
    MissingPathParam {
        /// Path parameter name.
        name: &'static str,
    },
    /// A query parameter could not be interpreted.
    #[error("invalid value '{value}' for query parameter '{name}'")]
    InvalidQuery {
        /// Query parameter name.
        name: &'static str,
        /// Value as received.
        value: String,
    },
    /// The graph has no flag answering to the name.
    #[error("unknown flag '{name}'")]
    UnknownFlag {
        /// Flag name or alias.
        name: String,
    },
}

/// Errors surfaced while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The invocation could not be built.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// The command pipeline reported a failure.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// The blocking task running the action did not complete.
    #[error("action task failed: {source}")]
    Join {
        /// Underlying join error.
        #[source]
        source: JoinError,
    },
}
