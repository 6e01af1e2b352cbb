use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware;
use futures_util::stream;
use http_body_util::BodyExt;
use tower::{Layer, Service, ServiceExt};

use nerdshim::models::engine::{
    ContainerRecord, EngineClientVersion, EngineVersion, ImageRecord, LabelSet, StringOrList,
};
use nerdshim::models::image::ImageDeleteItem;
use nerdshim::models::version::ComponentVersion;
use nerdshim::repositories::engine_client::{LineStream, MockEngineClient};

fn alpine_record() -> ImageRecord {
    ImageRecord {
        id: "b09a3b0".to_string(),
        repository: "alpine".to_string(),
        tag: "latest".to_string(),
        digest: "sha256:beefdead".to_string(),
        created_at: "1970-01-01 00:00:10 +0000 UTC".to_string(),
        size: "3.0 MiB".to_string(),
    }
}

fn line_stream(lines: Vec<&str>) -> LineStream {
    Box::pin(stream::iter(
        lines
            .into_iter()
            .map(|l| Ok(l.to_string()))
            .collect::<Vec<_>>(),
    ))
}

fn engine_version() -> EngineVersion {
    EngineVersion {
        client: EngineClientVersion {
            version: "1.7.6".to_string(),
            git_commit: "845e989".to_string(),
            go_version: "go1.22.2".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        },
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn given_ping_requests_when_head_and_get_then_advertised_versions_differ() {
    let app = nerdshim::app(Arc::new(MockEngineClient::new()));

    let head = app
        .clone()
        .oneshot(
            Request::builder()
                .method("HEAD")
                .uri("/_ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let get = app
        .oneshot(Request::builder().uri("/_ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(get.status(), StatusCode::OK);
    let head_version = head.headers().get("Api-Version").unwrap();
    let get_version = get.headers().get("Api-Version").unwrap();
    assert_eq!(head_version, "1.43");
    assert_eq!(get_version, "1.24");
    assert_eq!(
        head.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(head.headers().get(header::PRAGMA).unwrap(), "no-cache");
    assert_eq!(body_string(head).await, "");
    assert_eq!(body_string(get).await, "OK");
}

#[tokio::test]
async fn given_unversioned_path_when_requested_then_rewritten_to_current_dialect() {
    let mut mock = MockEngineClient::new();
    mock.expect_list_images()
        .times(2)
        .returning(|| Ok(vec![alpine_record()]));

    let app = nerdshim::app(Arc::new(mock));
    let mut service = middleware::from_fn(nerdshim::negotiate_api_version).layer(app);

    for uri in ["/images/json", "/v1.43/images/json"] {
        let response = service
            .ready()
            .await
            .unwrap()
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("alpine:latest"), "unexpected body: {body}");
    }
}

#[tokio::test]
async fn given_wrong_content_type_when_load_then_rejected_naming_the_type() {
    let app = nerdshim::app(Arc::new(MockEngineClient::new()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1.43/images/load")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("application/json"), "unexpected body: {body}");
}

#[tokio::test]
async fn given_slash_bearing_image_name_when_pushed_then_dispatched_to_push() {
    let mut mock = MockEngineClient::new();
    mock.expect_push_image()
        .withf(|reference| reference == "ghcr.io/acme/web:1.0")
        .returning(|_| Ok(line_stream(vec!["pushing manifest"])));

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1.43/images/ghcr.io/acme/web/push?tag=1.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body, "{\"stream\":\"pushing manifest\\n\"}\n");
}

#[tokio::test]
async fn given_slash_bearing_image_name_when_inspected_then_dispatched_to_inspect() {
    let mut mock = MockEngineClient::new();
    mock.expect_inspect_image()
        .withf(|name| name == "ghcr.io/acme/web")
        .returning(|_| Ok(serde_json::json!({"Id": "sha256:abc"})));

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/images/ghcr.io/acme/web/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("sha256:abc"));
}

#[tokio::test]
async fn given_image_removal_when_requested_then_untagged_and_deleted_reported() {
    let mut mock = MockEngineClient::new();
    mock.expect_remove_image().returning(|_| {
        Ok(vec![
            ImageDeleteItem::Untagged("alpine:latest".to_string()),
            ImageDeleteItem::Deleted("sha256:abc".to_string()),
        ])
    });

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1.43/images/alpine:latest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        body,
        r#"[{"Untagged":"alpine:latest"},{"Deleted":"sha256:abc"}]"#
    );
}

#[tokio::test]
async fn given_unknown_image_when_inspected_then_404() {
    use nerdshim::errors::engine::EngineError;

    let mut mock = MockEngineClient::new();
    mock.expect_inspect_image().returning(|_| {
        Err(EngineError::NotFound {
            message: "no such object: ghost".to_string(),
        })
    });

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/images/ghost/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_old_dialect_when_version_then_components_omitted() {
    let mut mock = MockEngineClient::new();
    mock.expect_client_version().returning(|| Ok(engine_version()));
    mock.expect_component_versions().never();

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.24/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body.get("Components").is_none());
    assert_eq!(body["ApiVersion"], "1.43");
    assert_eq!(body["MinAPIVersion"], "1.24");
}

#[tokio::test]
async fn given_current_dialect_when_version_then_components_present() {
    let mut mock = MockEngineClient::new();
    mock.expect_client_version().returning(|| Ok(engine_version()));
    mock.expect_component_versions().returning(|| {
        Ok(vec![ComponentVersion::new(
            "nerdctl",
            "1.7.6".to_string(),
            None,
        )])
    });

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["Components"][0]["Name"], "nerdctl");
    assert_eq!(body["Platform"]["Name"], "nerdctl/1.7.6");
}

#[tokio::test]
async fn given_missing_from_image_when_create_then_400() {
    let app = nerdshim::app(Arc::new(MockEngineClient::new()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1.43/images/create")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_tar_context_when_build_then_progress_streamed() {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    let dockerfile = b"FROM alpine\n";
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "Dockerfile", dockerfile.as_slice())
        .unwrap();
    let context = builder.into_inner().unwrap();

    let mut mock = MockEngineClient::new();
    mock.expect_build_image()
        .withf(|context, options| {
            context.join("Dockerfile").is_file() && options.tag.as_deref() == Some("web:1.0")
        })
        .returning(|_, _| Ok(line_stream(vec!["[1/1] FROM alpine", "DONE"])));

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1.43/build?t=web:1.0")
                .header(header::CONTENT_TYPE, "application/x-tar")
                .body(Body::from(context))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(
        body,
        "{\"stream\":\"[1/1] FROM alpine\\n\"}\n{\"stream\":\"DONE\\n\"}\n"
    );
}

#[tokio::test]
async fn given_containers_when_listed_then_docker_shaped_summaries() {
    let mut mock = MockEngineClient::new();
    mock.expect_list_containers()
        .withf(|all| !*all)
        .returning(|_| {
            Ok(vec![ContainerRecord {
                id: "3f2a91c".to_string(),
                names: StringOrList::One("web".to_string()),
                image: "nginx:alpine".to_string(),
                command: "\"nginx\"".to_string(),
                created_at: "1970-01-01 00:00:10 +0000 UTC".to_string(),
                status: "Up 3 minutes".to_string(),
                labels: LabelSet::Text("app=web".to_string()),
            }])
        });

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/containers/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body[0]["Names"][0], "/web");
    assert_eq!(body[0]["State"], "running");
    assert_eq!(body[0]["Labels"]["app"], "web");
}

#[tokio::test]
async fn given_container_logs_when_requested_then_multiplexed_frames() {
    let mut mock = MockEngineClient::new();
    mock.expect_container_logs()
        .returning(|_, _| Ok(vec!["hello".to_string()]));

    let app = nerdshim::app(Arc::new(mock));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/containers/web/logs?stdout=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.docker.multiplexed-stream"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..8], &[1, 0, 0, 0, 0, 0, 0, 6]);
    assert_eq!(&bytes[8..], b"hello\n");
}

#[tokio::test]
async fn given_export_without_names_when_requested_then_400() {
    let app = nerdshim::app(Arc::new(MockEngineClient::new()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1.43/images/get")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
