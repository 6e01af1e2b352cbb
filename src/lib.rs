pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod parsers;
pub mod repositories;
pub mod stream;
pub mod telemetry;
pub mod usecases;

use std::os::unix::net::UnixDatagram;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Router, ServiceExt};
use listenfd::ListenFd;
use tokio::net::{TcpListener, UnixListener};
use tower::Layer;
use tracing::info;

use crate::config::{Config, ListenAddress};
use crate::errors::ShimError;
use crate::repositories::engine_cli::EngineCli;
use crate::repositories::engine_client::EngineClient;
use crate::usecases::AppState;

/// Newest Docker API dialect the shim speaks.
pub const API_VERSION: &str = "1.43";
/// Oldest dialect still accepted; GET /_ping advertises this one.
pub const MIN_API_VERSION: &str = "1.24";

const CONFIG_ENV: &str = "NERDSHIM_CONFIG";

/// Builds the router over any engine client. Image names may contain
/// slashes, so everything under `images/` that takes a name is one wildcard
/// route with a trailing-verb dispatch; the static `json`/`get`/`create`/
/// `load` routes still win because static segments outrank wildcards.
pub fn app<C: EngineClient>(client: Arc<C>) -> Router {
    Router::new()
        .route("/_ping", get(handlers::system::ping_get).head(handlers::system::ping_head))
        .route("/{ver}/version", get(handlers::system::version::<C>))
        .route("/{ver}/info", get(handlers::system::info::<C>))
        .route("/{ver}/system/df", get(handlers::system::disk_usage::<C>))
        .route("/{ver}/images/json", get(handlers::images::list_images::<C>))
        .route("/{ver}/images/get", get(handlers::images::export_images::<C>))
        .route("/{ver}/images/create", post(handlers::images::create_image::<C>))
        .route("/{ver}/images/load", post(handlers::images::load_images::<C>))
        .route(
            "/{ver}/images/{*slug}",
            get(handlers::images::image_dispatch_get::<C>)
                .post(handlers::images::image_dispatch_post::<C>)
                .delete(handlers::images::remove_image::<C>),
        )
        .route("/{ver}/containers/json", get(handlers::containers::list_containers::<C>))
        .route(
            "/{ver}/containers/{name}/json",
            get(handlers::containers::inspect_container::<C>),
        )
        .route(
            "/{ver}/containers/{name}/logs",
            get(handlers::containers::container_logs::<C>),
        )
        .route("/{ver}/volumes", get(handlers::volumes::list_volumes::<C>))
        .route("/{ver}/volumes/{name}", get(handlers::volumes::inspect_volume::<C>))
        .route("/{ver}/networks", get(handlers::volumes::list_networks::<C>))
        .route("/{ver}/networks/{name}", get(handlers::volumes::inspect_network::<C>))
        .route("/{ver}/build", post(handlers::build::build_image::<C>))
        .route("/{ver}/build/prune", post(handlers::build::prune_build_cache::<C>))
        .with_state(AppState::new(client))
}

/// Rewrites unversioned request paths to the newest dialect. Docker clients
/// may omit the `/v1.43` prefix entirely; `/_ping` is never versioned. Runs
/// before route matching, so it must wrap the router rather than be layered
/// inside it.
pub async fn negotiate_api_version(mut request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path != "/_ping" && !has_version_prefix(path) {
        let rewritten = match request.uri().query() {
            Some(query) => format!("/v{}{}?{}", API_VERSION, path, query),
            None => format!("/v{}{}", API_VERSION, path),
        };
        if let Ok(uri) = rewritten.parse() {
            *request.uri_mut() = uri;
        }
    }
    next.run(request).await
}

fn has_version_prefix(path: &str) -> bool {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    let token = first.strip_prefix('v').unwrap_or(first);
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit() || c == '.')
}

pub async fn start() -> anyhow::Result<()> {
    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::default(),
    };
    telemetry::init(&config.telemetry)?;

    let address: ListenAddress = config.server.address.parse().map_err(ShimError::Config)?;
    let client = Arc::new(EngineCli::new(config.engine.clone()));
    let service = ServiceExt::<Request>::into_make_service(
        middleware::from_fn(negotiate_api_version).layer(app(client)),
    );

    match address {
        ListenAddress::Unix(path) => {
            // A stale socket from a previous run would make bind fail.
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context("removing stale socket"),
            }
            let listener = UnixListener::bind(&path)
                .with_context(|| format!("binding {}", path.display()))?;
            info!(address = %path.display(), "listening on unix socket");
            notify_ready();
            axum::serve(listener, service).await?;
        }
        ListenAddress::Tcp(addr) => {
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            info!(address = %addr, "listening on tcp");
            notify_ready();
            axum::serve(listener, service).await?;
        }
        ListenAddress::Fd(index) => {
            let mut fds = ListenFd::from_env();
            if let Some(listener) = fds.take_unix_listener(index)? {
                listener.set_nonblocking(true)?;
                let listener = UnixListener::from_std(listener)?;
                info!(index, "listening on inherited unix socket");
                notify_ready();
                axum::serve(listener, service).await?;
            } else if let Some(listener) = fds.take_tcp_listener(index)? {
                listener.set_nonblocking(true)?;
                let listener = TcpListener::from_std(listener)?;
                info!(index, "listening on inherited tcp socket");
                notify_ready();
                axum::serve(listener, service).await?;
            } else {
                anyhow::bail!("no inherited listener at index {}", index);
            }
        }
    }
    Ok(())
}

/// Tells the supervising init that the listener is up. Best effort: a
/// missing or unwritable notify socket is not an error.
fn notify_ready() {
    let Ok(path) = std::env::var("NOTIFY_SOCKET") else {
        return;
    };
    if path.starts_with('@') {
        // Abstract namespace sockets are not addressable through the
        // std datagram API.
        return;
    }
    if let Ok(socket) = UnixDatagram::unbound() {
        let _ = socket.send_to(b"READY=1", &path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_versioned_paths_when_checked_then_prefix_recognized() {
        assert!(has_version_prefix("/v1.43/images/json"));
        assert!(has_version_prefix("/1.24/containers/json"));
        assert!(has_version_prefix("/v1/info"));
    }

    #[test]
    fn given_unversioned_paths_when_checked_then_no_prefix() {
        assert!(!has_version_prefix("/images/json"));
        assert!(!has_version_prefix("/version"));
        assert!(!has_version_prefix("/volumes"));
    }
}
