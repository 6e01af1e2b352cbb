use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::api::ApiError;
use crate::errors::ShimResult;
use crate::handlers::images::require_tar;
use crate::models::build::BuildOptions;
use crate::repositories::engine_client::EngineClient;
use crate::stream::progress_response;
use crate::usecases::AppState;

#[derive(Debug, Deserialize)]
pub struct BuildQuery {
    t: Option<String>,
    dockerfile: Option<String>,
    platform: Option<String>,
    buildargs: Option<String>,
    labels: Option<String>,
}

/// `POST /<ver>/build`. The body is the tar build context; `buildargs` and
/// `labels` arrive as JSON-encoded maps in the query string.
pub async fn build_image<C: EngineClient>(
    State(state): State<AppState<C>>,
    Query(query): Query<BuildQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ShimResult<Response> {
    require_tar(&headers)?;
    let options = BuildOptions {
        tag: query.t,
        dockerfile: query.dockerfile,
        platform: query.platform,
        build_args: decode_map("buildargs", query.buildargs)?,
        labels: decode_map("labels", query.labels)?,
    };
    let lines = state.build.build(body, options).await?;
    Ok(progress_response(lines))
}

pub async fn prune_build_cache<C: EngineClient>(
    State(state): State<AppState<C>>,
) -> ShimResult<Response> {
    Ok(Json(state.build.prune().await?).into_response())
}

fn decode_map(
    name: &'static str,
    raw: Option<String>,
) -> Result<BTreeMap<String, String>, ApiError> {
    match raw {
        None => Ok(BTreeMap::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| ApiError::InvalidQuery {
            name,
            reason: e.to_string(),
        }),
    }
}
