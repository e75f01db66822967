//! Docker-Engine-compatible HTTP surface.
//!
//! The routing table is static. Capability checks answer without consulting
//! the bridge; resource endpoints capture the API version segment without
//! validating it and hand the request to the [`RequestBridge`].

mod containers;
mod errors;
mod ping;
mod server;
mod system;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::bridge::RequestBridge;

pub use self::errors::ApiError;
pub use self::server::serve;

/// API version reported by `HEAD /_ping` and the version document.
pub const CURRENT_API_VERSION: &str = "1.43";
/// Oldest API version clients may negotiate, reported by `GET /_ping`.
pub const MIN_API_VERSION: &str = "1.23";

pub(crate) const API_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::api");

/// State shared with handlers.
#[derive(Debug, Clone)]
pub struct ApiState {
    bridge: Arc<RequestBridge>,
}

/// Builds the daemon's routing table.
#[must_use]
pub fn router(bridge: Arc<RequestBridge>) -> Router {
    let state = ApiState { bridge };
    Router::new()
        .route(
            "/_ping",
            get(ping::ping).head(ping::ping_head).fallback(errors::not_found),
        )
        .route(
            "/{version}/containers/create",
            post(containers::create)
                .delete(containers::remove_named_create)
                .fallback(errors::not_found),
        )
        .route(
            "/{version}/containers/{id}/start",
            post(containers::start).fallback(errors::not_found),
        )
        .route(
            "/{version}/containers/{id}/stop",
            post(containers::stop).fallback(errors::not_found),
        )
        .route(
            "/{version}/containers/{id}/kill",
            post(containers::kill).fallback(errors::not_found),
        )
        .route(
            "/{version}/containers/{id}",
            delete(containers::remove).fallback(errors::not_found),
        )
        .route(
            "/{version}/version",
            get(system::version).fallback(errors::not_found),
        )
        .fallback(errors::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
