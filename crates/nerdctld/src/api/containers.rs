use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;

use crate::bridge::{ApiRequest, Operation};

use super::{ApiError, ApiState};

type QueryParams = Query<BTreeMap<String, String>>;

const CREATE_SEGMENT: &str = "create";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct CreateResponse {
    id: String,
    warnings: Vec<String>,
}

pub(super) async fn create(
    State(state): State<ApiState>,
    Path(version): Path<String>,
    Query(query): QueryParams,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateResponse>), ApiError> {
    let request = ApiRequest::new(&version, Operation::ContainerCreate)
        .with_query(query)
        .with_body(body);
    let output = state.bridge.dispatch(request).await?;
    let id = String::from_utf8_lossy(&output).trim().to_owned();
    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            id,
            warnings: Vec::new(),
        }),
    ))
}

pub(super) async fn start(
    state: State<ApiState>,
    path: Path<(String, String)>,
    query: QueryParams,
) -> Result<StatusCode, ApiError> {
    lifecycle(Operation::ContainerStart, state, path, query).await
}

pub(super) async fn stop(
    state: State<ApiState>,
    path: Path<(String, String)>,
    query: QueryParams,
) -> Result<StatusCode, ApiError> {
    lifecycle(Operation::ContainerStop, state, path, query).await
}

pub(super) async fn kill(
    state: State<ApiState>,
    path: Path<(String, String)>,
    query: QueryParams,
) -> Result<StatusCode, ApiError> {
    lifecycle(Operation::ContainerKill, state, path, query).await
}

pub(super) async fn remove(
    state: State<ApiState>,
    path: Path<(String, String)>,
    query: QueryParams,
) -> Result<StatusCode, ApiError> {
    lifecycle(Operation::ContainerRemove, state, path, query).await
}

/// `DELETE /{version}/containers/create` removes the container named `create`,
/// whose path is shadowed by the create route.
pub(super) async fn remove_named_create(
    state: State<ApiState>,
    Path(version): Path<String>,
    query: QueryParams,
) -> Result<StatusCode, ApiError> {
    let path = Path((version, CREATE_SEGMENT.to_owned()));
    lifecycle(Operation::ContainerRemove, state, path, query).await
}

async fn lifecycle(
    operation: Operation,
    State(state): State<ApiState>,
    Path((version, id)): Path<(String, String)>,
    Query(query): QueryParams,
) -> Result<StatusCode, ApiError> {
    let request = ApiRequest::new(&version, operation)
        .with_path_param("id", id)
        .with_query(query);
    state.bridge.dispatch(request).await?;
    Ok(StatusCode::NO_CONTENT)
}
