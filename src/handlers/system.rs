use axum::extract::{Path, State};
use axum::http::header::{HeaderName, CACHE_CONTROL, PRAGMA};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::ShimResult;
use crate::repositories::engine_client::EngineClient;
use crate::usecases::AppState;
use crate::{API_VERSION, MIN_API_VERSION};

const API_VERSION_HEADER: HeaderName = HeaderName::from_static("api-version");
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// `HEAD /_ping` advertises the newest API version the shim speaks. The
/// body stays empty so the advertised Content-Length is zero.
pub async fn ping_head() -> Response {
    ping_response(API_VERSION, "")
}

/// `GET /_ping` advertises the oldest supported API version, so clients
/// probing with GET fall back to a dialect every backend understands.
pub async fn ping_get() -> Response {
    ping_response(MIN_API_VERSION, "OK")
}

fn ping_response(version: &'static str, body: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (API_VERSION_HEADER, version),
            (CACHE_CONTROL, NO_CACHE),
            (PRAGMA, "no-cache"),
        ],
        body,
    )
        .into_response()
}

pub async fn version<C: EngineClient>(
    Path(ver): Path<String>,
    State(state): State<AppState<C>>,
) -> ShimResult<Response> {
    let response = state
        .system
        .version(&ver, API_VERSION, MIN_API_VERSION)
        .await?;
    Ok(Json(response).into_response())
}

pub async fn info<C: EngineClient>(State(state): State<AppState<C>>) -> ShimResult<Response> {
    Ok(Json(state.system.info().await?).into_response())
}

pub async fn disk_usage<C: EngineClient>(State(state): State<AppState<C>>) -> ShimResult<Response> {
    Ok(Json(state.system.disk_usage().await?).into_response())
}
