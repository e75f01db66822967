//! Request bridging between the HTTP surface and the command pipeline.
//!
//! Each inbound request becomes an [`ApiRequest`], from which
//! [`build_invocation`] assembles a brand-new [`CommandSpec`] seeded with the
//! process-wide [`CommandDefaults`](nerdctld_config::CommandDefaults). The
//! rendered [`CommandInvocation`] is then executed by an [`ActionPipeline`] on
//! the blocking pool. No command graph outlives its request, so concurrent
//! requests never observe each other's flags.

mod builder;
mod create;
mod dispatch;
mod errors;
mod invocation;
mod operation;
mod pipeline;
mod request;
mod spec;

pub use self::builder::build_invocation;
pub use self::dispatch::RequestBridge;
pub use self::errors::{BridgeError, DispatchError};
pub use self::invocation::{CommandInvocation, ExecutionContext};
pub use self::operation::Operation;
pub use self::pipeline::{
    ActionError, ActionErrorKind, ActionPipeline, CommandResult, ExecPipeline,
};
pub use self::request::ApiRequest;
pub use self::spec::{
    CommandSpec, END_OF_OPTIONS, Flag, FlagAlias, FlagSet, FlagValue, INHERITED_ALIASES,
};

pub(crate) const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");
