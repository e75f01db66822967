use std::collections::BTreeMap;

use bytes::Bytes;

use super::operation::Operation;

/// Inbound API request, parsed once by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// API version segment, without a leading `v`.
    pub api_version: String,
    /// Resource collection addressed (`containers`).
    pub resource: String,
    /// Operation selected by method and path.
    pub operation: Operation,
    /// Named path segments such as `id`.
    pub path_params: BTreeMap<String, String>,
    /// Query parameters.
    pub query: BTreeMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
}

impl ApiRequest {
    /// Request for `operation` addressed at `api_version`.
    #[must_use]
    pub fn new(api_version: &str, operation: Operation) -> Self {
        let api_version = api_version.strip_prefix('v').unwrap_or(api_version);
        Self {
            api_version: api_version.to_owned(),
            resource: operation.resource().to_owned(),
            operation,
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.insert(name.to_owned(), value.into());
        self
    }

    /// Replaces the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Adds one query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.insert(name.to_owned(), value.into());
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Path parameter by name.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Non-empty query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
