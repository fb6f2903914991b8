use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use preview_check::{
    download::{download_to_dir, download_url},
    notice::Notices,
    poller::{PollOutcome, PollRequest, PreviewPoller},
    status::{CheckError, HttpStatusSource, PreviewStatus, StatusSource},
    util::sha256_hex,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const PREFIX: &str = "/api/preview/file?uri=";

#[derive(Clone, Default)]
struct AppState {
    slow_calls: Arc<AtomicUsize>,
}

async fn preview(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let uri = params.get("uri").cloned().unwrap_or_default();
    match uri.as_str() {
        "/file/ready.docx" => Json(json!({
            "success": true,
            "message": "success",
            "data": { "type": 1, "url": "http://cdn.local/preview/ready.pdf" },
            "code": 0
        }))
        .into_response(),
        "/file/converting.docx" => Json(json!({
            "success": true,
            "data": { "type": 2, "progress": 42.4 }
        }))
        .into_response(),
        "/file/failed.docx" => Json(json!({
            "success": true,
            "data": { "type": 3, "error": { "reason": "corrupt archive" } }
        }))
        .into_response(),
        "/file/missing.docx" => Json(json!({
            "success": false,
            "message": "file not found"
        }))
        .into_response(),
        "/file/eventually.docx" => {
            let n = state.slow_calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Json(json!({ "success": true, "data": { "type": 2, "progress": n * 50 } }))
                    .into_response()
            } else {
                Json(json!({ "success": true, "data": { "type": 1, "url": "http://cdn.local/e.pdf" } }))
                    .into_response()
            }
        }
        "/file/garbage.docx" => "not json".into_response(),
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn serve(state: AppState) -> String {
    let router = Router::new()
        .route("/api/preview/file", get(preview))
        .route(
            "/file/download/2024/report.pdf",
            get(|| async { b"%PDF-1.7 test".to_vec() }),
        )
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn source(base: &str) -> HttpStatusSource {
    HttpStatusSource::with_client(reqwest::Client::new(), base, PREFIX).unwrap()
}

fn decoded(result: preview_check::status::ApiResult<preview_check::status::PreviewInfo>) -> PreviewStatus {
    PreviewStatus::try_from(result.data.expect("data")).expect("known status")
}

#[tokio::test]
async fn builds_status_url_from_prefix() {
    let src = source("http://preview.local:8080");
    let url = src.status_url("/file/data/a.docx").unwrap();
    assert_eq!(url.path(), "/api/preview/file");
    assert_eq!(url.query(), Some("uri=/file/data/a.docx"));

    let src = source("http://preview.local/app/");
    let url = src.status_url("/file/data/a.docx").unwrap();
    assert_eq!(url.path(), "/app/api/preview/file");
    assert_eq!(url.query(), Some("uri=/file/data/a.docx"));
}

#[tokio::test]
async fn decodes_each_status_kind() {
    let base = serve(AppState::default()).await;
    let src = source(&base);

    let ready = src.check("/file/ready.docx").await.unwrap();
    assert!(ready.success);
    assert_eq!(
        decoded(ready),
        PreviewStatus::Previewable("http://cdn.local/preview/ready.pdf".into())
    );

    let converting = src.check("/file/converting.docx").await.unwrap();
    assert_eq!(decoded(converting), PreviewStatus::Converting(42));

    let failed = src.check("/file/failed.docx").await.unwrap();
    assert_eq!(
        decoded(failed),
        PreviewStatus::ConversionError(r#"{"reason":"corrupt archive"}"#.into())
    );

    let missing = src.check("/file/missing.docx").await.unwrap();
    assert!(!missing.success);
    assert_eq!(missing.message.as_deref(), Some("file not found"));
    assert!(missing.data.is_none());
}

#[tokio::test]
async fn http_errors_surface_as_check_errors() {
    let base = serve(AppState::default()).await;
    let src = source(&base);

    let err = src.check("/file/unknown.docx").await.unwrap_err();
    assert!(matches!(err, CheckError::Status(500)));

    let err = src.check("/file/garbage.docx").await.unwrap_err();
    assert!(matches!(err, CheckError::Decode(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let poller = PreviewPoller::new(Arc::new(source(&base)), Notices::default());
    let summary = poller
        .start(PollRequest::new("/file/ready.docx"))
        .unwrap()
        .join()
        .await
        .unwrap();

    assert!(matches!(summary.outcome, PollOutcome::TransportFailed { .. }));
    assert_eq!(summary.checks, 1);
}

#[tokio::test]
async fn polls_over_http_until_ready() {
    let state = AppState::default();
    let base = serve(state.clone()).await;
    let poller = PreviewPoller::new(Arc::new(source(&base)), Notices::default())
        .with_interval(Duration::from_millis(50));

    let progress = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = progress.clone();
    let summary = poller
        .start(
            PollRequest::new("/file/eventually.docx")
                .on_progress(move |p| seen.lock().unwrap().push(p)),
        )
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!(
        summary.outcome,
        PollOutcome::Ready {
            url: "http://cdn.local/e.pdf".into()
        }
    );
    assert_eq!(summary.checks, 3);
    assert_eq!(*progress.lock().unwrap(), vec![0, 50]);
    assert_eq!(state.slow_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn downloads_through_rewritten_url() {
    let base = serve(AppState::default()).await;
    let repo_url = format!("{base}/file/repo/2024/report.pdf");
    let target = download_url(&repo_url, "/file/repo", "/file/download").unwrap();
    assert_eq!(target, format!("{base}/file/download/2024/report.pdf"));

    let dir = tempfile::tempdir().unwrap();
    let file = download_to_dir(&reqwest::Client::new(), &target, dir.path())
        .await
        .unwrap();

    assert_eq!(file.path, dir.path().join("report.pdf"));
    assert_eq!(file.bytes, 13);
    assert_eq!(std::fs::read(&file.path).unwrap(), b"%PDF-1.7 test");
    assert_eq!(file.sha256, sha256_hex(b"%PDF-1.7 test"));
}
