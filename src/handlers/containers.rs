use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::ShimResult;
use crate::repositories::engine_client::EngineClient;
use crate::stream::mux_frame;
use crate::usecases::AppState;

const MULTIPLEXED_STREAM: &str = "application/vnd.docker.multiplexed-stream";

#[derive(Debug, Deserialize)]
pub struct ListContainersQuery {
    all: Option<String>,
}

pub async fn list_containers<C: EngineClient>(
    State(state): State<AppState<C>>,
    Query(query): Query<ListContainersQuery>,
) -> ShimResult<Response> {
    let all = matches!(query.all.as_deref(), Some("1") | Some("true"));
    Ok(Json(state.containers.list(all).await?).into_response())
}

pub async fn inspect_container<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, name)): Path<(String, String)>,
) -> ShimResult<Response> {
    Ok(Json(state.containers.inspect(&name).await?).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    tail: Option<String>,
}

/// `GET /<ver>/containers/<name>/logs`. Every line is framed as stdout; the
/// engine's log command does not separate the two output channels.
pub async fn container_logs<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, name)): Path<(String, String)>,
    Query(query): Query<LogsQuery>,
) -> ShimResult<Response> {
    let lines = state.containers.logs(&name, query.tail).await?;
    let mut body = Vec::new();
    for line in lines {
        body.extend_from_slice(&mux_frame(format!("{}\n", line).as_bytes()));
    }
    Ok((
        [(CONTENT_TYPE, MULTIPLEXED_STREAM)],
        Body::from(body),
    )
        .into_response())
}
