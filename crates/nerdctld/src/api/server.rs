//! Accept loop driving hyper connections over a [`ServeListener`].

use std::io;
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::Service;
use tracing::{debug, info, warn};

use crate::transport::{Accepted, ServeListener};

use super::API_TARGET;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Serves `router` on `listener` until `shutdown` is cancelled.
///
/// Cancellation stops accepting, releases the listener, asks open connections
/// to finish their current exchange, and waits for them for at most `drain`.
/// Accept errors are logged once per error kind and retried after a short
/// backoff; they never stop the server.
pub async fn serve(
    listener: ServeListener,
    router: Router,
    shutdown: CancellationToken,
    drain: Duration,
) {
    info!(
        target: API_TARGET,
        address = %listener.address(),
        "serving API"
    );
    let connections = TaskTracker::new();
    let mut last_error = None::<io::ErrorKind>;
    loop {
        let accepted = select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok(connection) => {
                last_error = None;
                connections.spawn(serve_connection(
                    connection,
                    router.clone(),
                    shutdown.clone(),
                ));
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: API_TARGET,
                        error = %error,
                        "accept error"
                    );
                }
                last_error = Some(kind);
                select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                }
            }
        }
    }

    listener.release();
    connections.close();
    info!(
        target: API_TARGET,
        in_flight = connections.len(),
        drain_ms = u64::try_from(drain.as_millis()).unwrap_or(u64::MAX),
        "stopped accepting connections"
    );
    if tokio::time::timeout(drain, connections.wait()).await.is_err() {
        warn!(
            target: API_TARGET,
            abandoned = connections.len(),
            "drain budget elapsed; abandoning in-flight connections"
        );
    }
}

async fn serve_connection(connection: Accepted, router: Router, shutdown: CancellationToken) {
    let result = match connection {
        Accepted::Tcp(stream) => drive(TokioIo::new(stream), router, shutdown).await,
        Accepted::Unix(stream) => drive(TokioIo::new(stream), router, shutdown).await,
    };
    match result {
        Ok(()) => {}
        Err(error) if error.is_incomplete_message() || error.is_closed() => {
            debug!(
                target: API_TARGET,
                error = %error,
                "client disconnected"
            );
        }
        Err(error) => {
            warn!(
                target: API_TARGET,
                error = %error,
                "error serving connection"
            );
        }
    }
}

async fn drive<I>(io: I, router: Router, shutdown: CancellationToken) -> Result<(), hyper::Error>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| router.clone().call(request));
    let connection = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(connection);
    select! {
        result = connection.as_mut() => result,
        () = shutdown.cancelled() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    }
}
