//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app(&[]);

    let (status, json) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["player"], "idle");
    assert_eq!(json["scripts_loaded"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_player_status() {
    let app = common::build_test_app(&[("Demo", "Hello")]);
    app.post_json("/api/v1/player/play", &serde_json::json!({ "script": "Demo" }))
        .await;
    app.wait_for_input().await;

    let (status, json) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["player"], "waiting_for_input");
    assert_eq!(json["scripts_loaded"], 1);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(&[]);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
