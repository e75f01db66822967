use std::collections::BTreeMap;

use uuid::Uuid;

use super::operation::Operation;
use super::spec::FlagValue;

/// Per-request metadata travelling with an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    request_id: Uuid,
    api_version: String,
    operation: Operation,
}

impl ExecutionContext {
    /// Context for a new request with a freshly generated identifier.
    #[must_use]
    pub fn new(api_version: impl Into<String>, operation: Operation) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            api_version: api_version.into(),
            operation,
        }
    }

    /// Identifier correlating logs for one request.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// API version segment the client addressed.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Operation being performed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }
}

/// Fully resolved command line for one request.
///
/// Built fresh for every request and owned by it; never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    argv: Vec<String>,
    flags: BTreeMap<String, FlagValue>,
    context: ExecutionContext,
}

impl CommandInvocation {
    pub(crate) const fn new(
        argv: Vec<String>,
        flags: BTreeMap<String, FlagValue>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            argv,
            flags,
            context,
        }
    }

    /// Arguments passed to the command pipeline, without the program name.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Resolved value of every declared flag, keyed by long name.
    #[must_use]
    pub const fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// Looks up a resolved flag value.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// Request metadata.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }
}
