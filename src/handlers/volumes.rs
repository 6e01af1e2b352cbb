use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::ShimResult;
use crate::repositories::engine_client::EngineClient;
use crate::usecases::AppState;

pub async fn list_volumes<C: EngineClient>(State(state): State<AppState<C>>) -> ShimResult<Response> {
    Ok(Json(state.volumes.volumes().await?).into_response())
}

pub async fn inspect_volume<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, name)): Path<(String, String)>,
) -> ShimResult<Response> {
    Ok(Json(state.volumes.volume(&name).await?).into_response())
}

pub async fn list_networks<C: EngineClient>(
    State(state): State<AppState<C>>,
) -> ShimResult<Response> {
    Ok(Json(state.volumes.networks().await?).into_response())
}

pub async fn inspect_network<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, name)): Path<(String, String)>,
) -> ShimResult<Response> {
    Ok(Json(state.volumes.network(&name).await?).into_response())
}
