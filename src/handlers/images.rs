use axum::body::Body;
use axum::extract::{Path, Query, RawQuery, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::TryStreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::errors::api::ApiError;
use crate::errors::ShimResult;
use crate::handlers::query_values;
use crate::repositories::engine_client::EngineClient;
use crate::stream::progress_response;
use crate::usecases::AppState;

const TAR_MEDIA_TYPES: [&str; 2] = ["application/x-tar", "application/tar"];

#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    filters: Option<String>,
}

pub async fn list_images<C: EngineClient>(
    State(state): State<AppState<C>>,
    Query(query): Query<ListImagesQuery>,
) -> ShimResult<Response> {
    Ok(Json(state.images.list(query.filters).await?).into_response())
}

/// `GET /<ver>/images/<name>/json` and `/<ver>/images/<name>/history`. The
/// name may itself contain slashes, so the route is a wildcard and the
/// trailing verb is split off here.
pub async fn image_dispatch_get<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, slug)): Path<(String, String)>,
) -> ShimResult<Response> {
    if let Some(name) = slug.strip_suffix("/json") {
        return Ok(Json(state.images.inspect(name).await?).into_response());
    }
    if let Some(name) = slug.strip_suffix("/history") {
        return Ok(Json(state.images.history(name).await?).into_response());
    }
    Ok(StatusCode::NOT_FOUND.into_response())
}

#[derive(Debug, Deserialize)]
pub struct PushQuery {
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    repo: Option<String>,
    tag: Option<String>,
}

/// `POST /<ver>/images/<name>/push` and `/<ver>/images/<name>/tag`.
pub async fn image_dispatch_post<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, slug)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
) -> ShimResult<Response> {
    if let Some(name) = slug.strip_suffix("/push") {
        let Query(query): Query<PushQuery> =
            Query::try_from_uri(&raw_uri(&raw_query)).map_err(|e| ApiError::InvalidQuery {
                name: "tag",
                reason: e.to_string(),
            })?;
        let lines = state.images.push(name, query.tag.as_deref()).await?;
        return Ok(progress_response(lines));
    }
    if let Some(name) = slug.strip_suffix("/tag") {
        let Query(query): Query<TagQuery> =
            Query::try_from_uri(&raw_uri(&raw_query)).map_err(|e| ApiError::InvalidQuery {
                name: "repo",
                reason: e.to_string(),
            })?;
        let repo = query.repo.ok_or(ApiError::MissingQuery { name: "repo" })?;
        let tag = query.tag.unwrap_or_else(|| "latest".to_string());
        state.images.tag(name, &repo, &tag).await?;
        return Ok(StatusCode::CREATED.into_response());
    }
    Ok(StatusCode::NOT_FOUND.into_response())
}

pub async fn remove_image<C: EngineClient>(
    State(state): State<AppState<C>>,
    Path((_ver, name)): Path<(String, String)>,
) -> ShimResult<Response> {
    Ok(Json(state.images.remove(&name).await?).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateImageQuery {
    #[serde(rename = "fromImage")]
    from_image: Option<String>,
    tag: Option<String>,
}

/// `POST /<ver>/images/create` pulls from a registry; importing from a body
/// is not supported, so `fromImage` is required.
pub async fn create_image<C: EngineClient>(
    State(state): State<AppState<C>>,
    Query(query): Query<CreateImageQuery>,
) -> ShimResult<Response> {
    let from = query
        .from_image
        .ok_or(ApiError::MissingQuery { name: "fromImage" })?;
    let lines = state.images.pull(&from, query.tag.as_deref()).await?;
    Ok(progress_response(lines))
}

#[derive(Debug, Deserialize)]
pub struct LoadQuery {
    quiet: Option<String>,
}

pub async fn load_images<C: EngineClient>(
    State(state): State<AppState<C>>,
    Query(query): Query<LoadQuery>,
    request: Request,
) -> ShimResult<Response> {
    require_tar(request.headers())?;
    if query.quiet.is_some() {
        debug!("quiet load requested; progress is streamed regardless");
    }
    let body = request
        .into_body()
        .into_data_stream()
        .map_err(std::io::Error::other);
    let lines = state.images.load(Box::pin(body)).await?;
    Ok(progress_response(lines))
}

pub async fn export_images<C: EngineClient>(
    State(state): State<AppState<C>>,
    RawQuery(raw_query): RawQuery,
) -> ShimResult<Response> {
    let names = query_values(raw_query.as_deref().unwrap_or(""), "names");
    if names.is_empty() {
        return Err(ApiError::MissingQuery { name: "names" }.into());
    }
    let bytes = state.images.save(names).await?;
    Ok((
        [(CONTENT_TYPE, "application/x-tar")],
        Body::from_stream(bytes),
    )
        .into_response())
}

pub(crate) fn require_tar(headers: &HeaderMap) -> Result<(), ApiError> {
    let received = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let media_type = received
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if TAR_MEDIA_TYPES.contains(&media_type.as_str()) {
        Ok(())
    } else {
        Err(ApiError::NotTar { received })
    }
}

fn raw_uri(raw_query: &Option<String>) -> axum::http::Uri {
    let path_and_query = match raw_query {
        Some(q) => format!("/?{}", q),
        None => "/".to_string(),
    };
    path_and_query.parse().unwrap_or_default()
}
