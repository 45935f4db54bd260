//! Integration tests for web routes.

mod common;

use std::sync::Arc;

use archivebox_api::web::create_app;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{add_log, already_archived_log, failed, ok, write_index, FakeCli, Harness};
use serde_json::{json, Value};
use tower::ServiceExt;

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let harness = Harness::new().await;
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(String::new()))));

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_add_success_then_list_and_serve_asset() {
    let harness = Harness::new().await;
    let url = "https://www.baidu.com/";
    write_index(
        &harness.archive_dir(),
        "1720073769.137125",
        url,
        &[ok("headers", "headers.json")],
    );
    std::fs::write(
        harness.archive_dir().join("1720073769.137125").join("headers.json"),
        "{}",
    )
    .unwrap();
    let cli = Arc::new(FakeCli::with_log(add_log(&[(url, "1720073769.137125")])));
    let app = create_app(harness.service(cli.clone()));

    let (status, body) = send(
        app.clone(),
        post_json("/add", &json!({"urls": [url], "tag": ["search"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "All URLs processed successfully.");
    assert_eq!(
        body["archive_paths"][url]["headers"],
        "/static/archive/1720073769.137125/headers.json"
    );
    assert!(body.get("failed_urls").is_none());

    let args = &cli.calls()[0];
    assert!(args.contains(&"--depth=0".to_string()));
    assert!(args.contains(&"--parser=auto".to_string()));

    let (status, body) = send(app.clone(), post_json("/list", &json!({"tag_names": ["search"]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["url"], url);
    assert_eq!(data[0]["domain"], "www.baidu.com");
    assert_eq!(data[0]["tags"], json!(["search"]));
    assert_eq!(data[0]["results"][0]["extractor"], "headers");
    assert_eq!(data[0]["results"][0]["status"], true);
    assert!(data[0]["results"][0].get("target_id").is_none());

    let response = app
        .oneshot(get("/static/archive/1720073769.137125/headers.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_mount_exposes_only_snapshots() {
    let harness = Harness::new().await;
    let snapshot = harness.archive_dir().join("1720073769.137125");
    std::fs::create_dir_all(&snapshot).unwrap();
    std::fs::write(snapshot.join("headers.json"), "{}").unwrap();
    std::fs::write(
        harness.config.data_dir.join("index.sqlite3"),
        "SQLite format 3 secret",
    )
    .unwrap();
    std::fs::write(
        harness.config.data_dir.join("ArchiveBox.conf"),
        "SECRET_KEY=hunter2",
    )
    .unwrap();
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(String::new()))));

    let response = app
        .clone()
        .oneshot(get("/static/archive/1720073769.137125/headers.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for uri in [
        "/static/index.sqlite3",
        "/static/ArchiveBox.conf",
        "/static/archive/../index.sqlite3",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {uri}");
    }
}

#[tokio::test]
async fn test_add_partial_success_is_multi_status() {
    let harness = Harness::new().await;
    let good = "https://good.example/";
    let bad = "https://bad.example/";
    write_index(
        &harness.archive_dir(),
        "1.1",
        good,
        &[ok("headers", "headers.json")],
    );
    write_index(&harness.archive_dir(), "1.2", bad, &[failed("headers")]);
    let log = add_log(&[(good, "1.1"), (bad, "1.2")]);
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(log))));

    let (status, body) = send(app, post_json("/add", &json!({"urls": [good, bad]}))).await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["status"], "partial_success");
    assert_eq!(body["failed_urls"], json!([bad]));
    assert!(body["archive_paths"][good].is_object());
}

#[tokio::test]
async fn test_add_all_failed_is_server_error() {
    let harness = Harness::new().await;
    let url = "https://bad.example/";
    write_index(&harness.archive_dir(), "1.2", url, &[failed("headers")]);
    let log = add_log(&[(url, "1.2")]);
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(log))));

    let (status, body) = send(app, post_json("/add", &json!({"urls": [url]}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "All URLs failed to process.");
    assert_eq!(body["failed_urls"], json!([url]));
}

#[tokio::test]
async fn test_add_already_archived() {
    let harness = Harness::new().await;
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(already_archived_log()))));

    let (status, body) = send(
        app,
        post_json("/add", &json!({"urls": ["https://www.baidu.com/"]})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["message"],
        "The requested target already exists. If you want to update it, please add the update parameter."
    );
}

#[tokio::test]
async fn test_add_tool_failure_reports_stderr() {
    let harness = Harness::new().await;
    let app = create_app(harness.service(Arc::new(FakeCli::failing("permission denied"))));

    let (status, body) = send(
        app,
        post_json("/add", &json!({"urls": ["https://www.baidu.com/"]})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["stderr"], "permission denied");
}

#[tokio::test]
async fn test_add_rejects_invalid_requests() {
    let harness = Harness::new().await;
    let cli = Arc::new(FakeCli::with_log(String::new()));
    let app = create_app(harness.service(cli.clone()));

    for body in [
        json!({"urls": []}),
        json!({"urls": ["ftp://example.com/"]}),
        json!({"urls": ["https://example.com/"], "depth": 2}),
        json!({"urls": ["https://example.com/"], "extractors": ["nope"]}),
        json!({"urls": ["https://example.com/"], "parser": "xml"}),
        json!({"tag": ["x"]}),
    ] {
        let (status, response) = send(app.clone(), post_json("/add", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response["status"], "error");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/add")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(cli.calls().is_empty());
}

#[tokio::test]
async fn test_sync_reports_counts() {
    let harness = Harness::new().await;
    write_index(
        &harness.archive_dir(),
        "1.1",
        "https://a.example/",
        &[ok("headers", "headers.json")],
    );
    let app = create_app(harness.service(Arc::new(FakeCli::with_log(String::new()))));

    let (status, body) = send(app, get("/sync")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["synchronized"], 1);
    assert_eq!(body["data"]["failed"], json!([]));
}
