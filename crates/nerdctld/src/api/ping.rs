use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, PRAGMA};
use axum::http::{HeaderName, StatusCode};
use axum::response::IntoResponse;

use super::{CURRENT_API_VERSION, MIN_API_VERSION};

pub(super) const API_VERSION: HeaderName = HeaderName::from_static("api-version");
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub(super) async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (CACHE_CONTROL, NO_CACHE),
            (PRAGMA, "no-cache"),
            (API_VERSION, MIN_API_VERSION),
        ],
        "OK",
    )
}

pub(super) async fn ping_head() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (CACHE_CONTROL, NO_CACHE),
            (PRAGMA, "no-cache"),
            (API_VERSION, CURRENT_API_VERSION),
            (CONTENT_TYPE, TEXT_PLAIN),
            (CONTENT_LENGTH, "0"),
        ],
    )
}
