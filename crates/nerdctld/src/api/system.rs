use axum::Json;
use serde::Serialize;

use super::{CURRENT_API_VERSION, MIN_API_VERSION};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct VersionDocument {
    platform: Platform,
    version: &'static str,
    api_version: &'static str,
    #[serde(rename = "MinAPIVersion")]
    min_api_version: &'static str,
    os: &'static str,
    arch: &'static str,
    experimental: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Platform {
    name: &'static str,
}

pub(super) async fn version() -> Json<VersionDocument> {
    Json(VersionDocument {
        platform: Platform {
            name: env!("CARGO_PKG_NAME"),
        },
        version: env!("CARGO_PKG_VERSION"),
        api_version: CURRENT_API_VERSION,
        min_api_version: MIN_API_VERSION,
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        experimental: false,
    })
}
