//! HTTP 路由组装、CORS 与安全头。

use axum::Router;
use axum::body::Body as AxumBody;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span, warn};

use crate::files;
use crate::storage::Storage;
use crate::upload;

/// 组装路由；测试可直接驱动返回的 Router 而无需监听端口。
pub fn build_router(storage: Arc<Storage>, max_body: usize, cors_origins: Option<&str>) -> Router {
    let body_limit = if max_body == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(max_body)
    };

    Router::new()
        .route("/upload", post(upload::upload_video).layer(body_limit))
        .route("/files", get(files::list_files))
        .route("/uploads/{name}", get(files::serve_upload))
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(build_cors_layer(cors_origins))
        .layer(Extension(storage))
}

/// 构建 CORS Layer：未配置来源时对所有来源开放。
pub fn build_cors_layer(cors_origins: Option<&str>) -> CorsLayer {
    let origins = cors_origins
        .unwrap_or_default()
        .split(',')
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "invalid cors origin");
                None
            }
        })
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 添加基础安全响应头。
pub async fn add_security_headers(
    request: Request<AxumBody>,
    next: Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::build_router;
    use crate::storage::Storage;
    use crate::upload::NO_FILE_BODY;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "vidbay-test-boundary";

    fn make_app() -> (tempfile::TempDir, Router) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("uploads");
        std::fs::create_dir_all(&root).expect("create upload root");
        let storage = Arc::new(Storage::new(root));
        let app = build_router(storage, 0, None);
        (temp, app)
    }

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn upload_without_video_field_is_rejected() {
        let (_temp, app) = make_app();
        let response = app
            .oneshot(multipart_request("document", "notes.txt", b"hello"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_bytes(response).await, NO_FILE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn listing_empty_directory_returns_empty_array() {
        let (_temp, app) = make_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/files")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"[]");
    }

    #[tokio::test]
    async fn upload_list_download_round_trip() {
        let (_temp, app) = make_app();
        let payload = b"fake video bytes".to_vec();

        let response = app
            .clone()
            .oneshot(multipart_request("video", "clip.mp4", &payload))
            .await
            .expect("upload response");
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded: Value =
            serde_json::from_slice(&body_bytes(response).await).expect("upload json");
        assert_eq!(uploaded["message"], "File uploaded successfully!");
        let file_path = uploaded["filePath"].as_str().expect("filePath");
        let name = file_path.strip_prefix("/uploads/").expect("uploads prefix");
        assert!(name.ends_with("-clip.mp4"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/files")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("list response");
        assert_eq!(response.status(), StatusCode::OK);
        let listing: Value =
            serde_json::from_slice(&body_bytes(response).await).expect("list json");
        let entries = listing.as_array().expect("array");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["name"], name);
        assert_eq!(entries[0]["url"], file_path);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(file_path)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("download response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, payload);
    }

    #[tokio::test]
    async fn range_request_returns_partial_content() {
        let (_temp, app) = make_app();
        let response = app
            .clone()
            .oneshot(multipart_request("video", "clip.mp4", b"0123456789"))
            .await
            .expect("upload response");
        let uploaded: Value =
            serde_json::from_slice(&body_bytes(response).await).expect("upload json");
        let file_path = uploaded["filePath"].as_str().expect("filePath").to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(&file_path)
                    .header(header::RANGE, "bytes=2-5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("range response");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_RANGE)
                .expect("content-range"),
            "bytes 2-5/10"
        );
        assert_eq!(body_bytes(response).await, b"2345");
    }

    #[tokio::test]
    async fn unknown_upload_is_not_found() {
        let (_temp, app) = make_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/uploads/123-missing.mp4")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_name_is_rejected() {
        let (_temp, app) = make_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/uploads/..%2Fsecret.txt")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
