//! Router tests driven through `tower::ServiceExt::oneshot`.
//!
//! FFmpeg and the asset store are replaced by a scripted runner and a
//! fetcher that writes the URL into the destination file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use vstitch_api::{create_router, ApiConfig, AppState};
use vstitch_media::testing::ScriptedRunner;
use vstitch_models::{AssetKind, LocalAsset};
use vstitch_storage::{AssetFetcher, FetchError, FetchResult};
use vstitch_worker::{JobOrchestrator, WorkerConfig};

struct FakeFetcher;

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(
        &self,
        source_url: &str,
        destination: &Path,
        kind: AssetKind,
    ) -> FetchResult<LocalAsset> {
        if source_url.contains("missing") {
            return Err(FetchError::Status {
                url: source_url.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        tokio::fs::write(destination, source_url.as_bytes()).await?;
        Ok(LocalAsset {
            source_url: source_url.to_string(),
            local_path: destination.to_path_buf(),
            kind,
        })
    }
}

struct TestApp {
    router: Router,
    work_dir: PathBuf,
    _base: TempDir,
}

impl TestApp {
    fn new(runner: ScriptedRunner) -> Self {
        Self::with_config(runner, ApiConfig::default())
    }

    fn with_config(runner: ScriptedRunner, config: ApiConfig) -> Self {
        let base = TempDir::new().unwrap();
        let work_dir = base.path().join("work");
        let worker = WorkerConfig {
            work_dir: work_dir.clone(),
            ..WorkerConfig::default()
        };
        let orchestrator = JobOrchestrator::new(worker, Arc::new(FakeFetcher), Arc::new(runner));
        let state = AppState::with_orchestrator(config, orchestrator);

        Self {
            router: create_router(state, None),
            work_dir,
            _base: base,
        }
    }

    async fn post(&self, uri: &str, body: Value) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Job directories still present once background cleanup has had up to 2s.
    async fn leftover_jobs(&self) -> usize {
        let count = || {
            std::fs::read_dir(&self.work_dir)
                .map(|d| d.count())
                .unwrap_or(0)
        };
        for _ in 0..200 {
            if count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        count()
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn create_video_streams_attachment_and_cleans_up() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .post(
            "/create-video",
            json!({
                "imageURL1": "https://cdn.test/a.png",
                "audioURL1": "https://cdn.test/a.mp3",
                "imageURL2": "https://cdn.test/b.jpg",
                "audioURL2": "https://cdn.test/b.wav",
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"final_video.mp4\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"scripted media");
    assert_eq!(app.leftover_jobs().await, 0);
}

#[tokio::test]
async fn create_video_without_pairs_lists_missing_fields() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app.post("/create-video", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["missingFields"], json!(["imageURL1", "audioURL1"]));
    assert!(body["error"].is_string());
    assert!(!app.work_dir.exists());
}

#[tokio::test]
async fn create_video_rejects_malformed_json() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/create-video")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn create_video_rejects_non_http_urls() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .post(
            "/create-video",
            json!({ "imageURL1": "file:///etc/passwd", "audioURL1": "https://cdn.test/a.mp3" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["invalidFields"], json!(["imageURL1"]));
}

#[tokio::test]
async fn failed_download_returns_500_and_leaves_nothing() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .post(
            "/create-video",
            json!({
                "imageURL1": "https://cdn.test/a.png",
                "audioURL1": "https://cdn.test/missing.mp3",
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("404"));
    assert_eq!(app.leftover_jobs().await, 0);
}

#[tokio::test]
async fn single_video_is_named_single_video() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .post(
            "/create-single-video",
            json!({ "imageURL": "https://cdn.test/a.png", "audioURL": "https://cdn.test/a.mp3" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"single_video.mp4\""
    );
    to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(app.leftover_jobs().await, 0);
}

#[tokio::test]
async fn merge_requires_every_video_field() {
    let app = TestApp::new(ScriptedRunner::new());

    let mut body = serde_json::Map::new();
    for i in 1..=5 {
        body.insert(
            format!("videoURL{}", i),
            json!(format!("https://cdn.test/{}.mp4", i)),
        );
    }

    let response = app.post("/merge-videos", Value::Object(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["missingFields"], json!(["videoURL6"]));
}

#[tokio::test]
async fn merge_delivers_final_merged_video() {
    let app = TestApp::new(ScriptedRunner::new());

    let mut body = serde_json::Map::new();
    for i in 1..=6 {
        body.insert(
            format!("videoURL{}", i),
            json!(format!("https://cdn.test/{}.mp4", i)),
        );
    }

    let response = app.post("/merge-videos", Value::Object(body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"final_merged_video.mp4\""
    );
}

#[tokio::test]
async fn ffmpeg_version_returns_banner() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/ffmpeg-version").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).starts_with("ffmpeg version"));
}

#[tokio::test]
async fn ffmpeg_version_failure_is_500() {
    let app = TestApp::new(ScriptedRunner::new().failing_on("-version"));

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/ffmpeg-version").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new(ScriptedRunner::new());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/health")
                .header("X-Request-ID", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn production_hides_job_error_details() {
    let config = ApiConfig {
        environment: "production".to_string(),
        ..ApiConfig::default()
    };
    let app = TestApp::with_config(ScriptedRunner::new(), config);

    let response = app
        .post(
            "/create-video",
            json!({
                "imageURL1": "https://cdn.test/a.png",
                "audioURL1": "https://cdn.test/missing.mp3",
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "An internal error occurred");
    assert_eq!(app.leftover_jobs().await, 0);
}

#[tokio::test]
async fn production_still_explains_validation_errors() {
    let config = ApiConfig {
        environment: "production".to_string(),
        ..ApiConfig::default()
    };
    let app = TestApp::with_config(ScriptedRunner::new(), config);

    let response = app.post("/create-single-video", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["missingFields"],
        json!(["imageURL", "audioURL"])
    );
}

#[tokio::test]
async fn oversized_content_length_gets_json_413() {
    let config = ApiConfig {
        max_body_size: 16,
        ..ApiConfig::default()
    };
    let app = TestApp::with_config(ScriptedRunner::new(), config);
    let body = json!({ "imageURL1": "https://cdn.test/a.png" }).to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/create-video")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(json_body(response).await["error"], "Request body too large");
    assert!(!app.work_dir.exists());
}
