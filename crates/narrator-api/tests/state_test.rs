//! Integration tests for rollback, save slots and reset.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use narrator_core::value::ScriptValue;
use narrator_slot_store::{FileSlotStore, SaveFormat};
use serde_json::json;

const SCORES: &str = "@set score=1\nFirst\n@set score=2\nSecond";

async fn play_to_second_wait(app: &common::TestApp, script: &str) {
    app.post_json("/api/v1/player/play", &json!({ "script": script })).await;
    app.wait_for_input().await;
    app.post_json("/api/v1/player/continue", &json!({})).await;
    app.wait_for_input().await;
}

#[tokio::test(start_paused = true)]
async fn test_rollback_resumes_at_line_with_restored_state() {
    // Arrange
    let app = common::build_test_app(&[("Demo", "First\nSecond\nThird")]);
    play_to_second_wait(&app, "Demo").await;

    // Act
    let (status, json) = app
        .post_json("/api/v1/state/rollback", &json!({ "line_index": 0 }))
        .await;
    app.wait_for_input().await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["spot"]["line_index"], 0);
    assert_eq!(
        app.presenter.printed_texts(),
        vec!["First".to_owned(), "Second".to_owned(), "First".to_owned()]
    );
    let (_, json) = app.get_json("/api/v1/player/status").await;
    assert_eq!(json["backlog"].as_array().unwrap().len(), 1);
    assert_eq!(json["rollback_steps"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_rollback_to_unvisited_line_returns_404() {
    let app = common::build_test_app(&[("Demo", "First\nSecond\nThird")]);
    play_to_second_wait(&app, "Demo").await;

    let (status, json) = app
        .post_json("/api/v1/state/rollback", &json!({ "line_index": 2 }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "rollback_target_not_found");
}

#[tokio::test]
async fn test_rollback_before_playing_returns_400() {
    let app = common::build_test_app(&[]);

    let (status, _) = app
        .post_json("/api/v1/state/rollback", &json!({ "line_index": 0 }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_save_then_load_restores_variables_and_spot() {
    // Arrange
    let app = common::build_test_app(&[("Scores", SCORES)]);
    app.post_json("/api/v1/player/play", &json!({ "script": "Scores" })).await;
    app.wait_for_input().await;
    let (status, json) = app
        .post_json("/api/v1/state/save", &json!({ "slot": "GameSave1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slot"], "GameSave1");
    app.post_json("/api/v1/player/continue", &json!({})).await;
    app.wait_for_input().await;

    // Act
    let (status, json) = app
        .post_json("/api/v1/state/load", &json!({ "slot": "GameSave1" }))
        .await;
    app.wait_for_input().await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["spot"]["line_index"], 1);
    assert_eq!(
        app.state.player.context().variables().get("score"),
        Some(ScriptValue::Integer(1))
    );
}

#[tokio::test(start_paused = true)]
async fn test_quick_save_listing_and_delete() {
    let app = common::build_test_app(&[("Scores", SCORES)]);
    app.post_json("/api/v1/player/play", &json!({ "script": "Scores" })).await;
    app.wait_for_input().await;

    let (status, json) = app.post_json("/api/v1/state/save", &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slot"], "GameQuickSave1");

    let (_, json) = app.get_json("/api/v1/state/saves").await;
    assert_eq!(json["slots"], json!(["GameQuickSave1"]));
    assert_eq!(json["any_save_exists"], true);

    assert_eq!(
        app.delete("/api/v1/state/saves/GameQuickSave1").await,
        StatusCode::NO_CONTENT
    );
    let (_, json) = app.get_json("/api/v1/state/saves").await;
    assert_eq!(json["any_save_exists"], false);
}

#[tokio::test]
async fn test_load_missing_slot_returns_404() {
    let app = common::build_test_app(&[]);

    let (status, json) = app
        .post_json("/api/v1/state/load", &json!({ "slot": "GameSave7" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "slot_not_found");
}

#[tokio::test]
async fn test_save_before_playing_returns_400() {
    let app = common::build_test_app(&[]);

    let (status, json) = app
        .post_json("/api/v1/state/save", &json!({ "slot": "GameSave1" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test(start_paused = true)]
async fn test_reset_keeps_variables_and_plays_next_script() {
    // Arrange
    let app = common::build_test_app(&[
        ("Intro", "@set seen=true\nHello"),
        ("Chapter2", "Chapter two"),
    ]);
    app.post_json("/api/v1/player/play", &json!({ "script": "Intro" })).await;
    app.wait_for_input().await;

    // Act
    let (status, _) = app
        .post_json("/api/v1/state/reset", &json!({ "script": "Chapter2" }))
        .await;
    app.wait_for_input().await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.get_json("/api/v1/player/status").await;
    assert_eq!(json["script"], "Chapter2");
    assert_eq!(json["backlog"].as_array().unwrap().len(), 1);
    assert_eq!(json["backlog"][0]["text"], "Chapter two");
    assert_eq!(
        app.state.player.context().variables().get("seen"),
        Some(ScriptValue::Boolean(true))
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_without_exclusions_clears_variables() {
    let app = common::build_test_app(&[("Intro", "@set seen=true\nHello")]);
    app.post_json("/api/v1/player/play", &json!({ "script": "Intro" })).await;
    app.wait_for_input().await;

    let (status, json) = app
        .post_json("/api/v1/state/reset", &json!({ "excluded": [] }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "stopped");
    assert_eq!(json["rollback_steps"], 0);
    assert_eq!(app.state.player.context().variables().get("seen"), None);
}

#[tokio::test(start_paused = true)]
async fn test_saves_land_on_disk_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let slots = Arc::new(FileSlotStore::new(dir.path(), SaveFormat::Binary));
    let app = common::build_test_app_with_slots(&[("Scores", SCORES)], slots);
    app.post_json("/api/v1/player/play", &json!({ "script": "Scores" })).await;
    app.wait_for_input().await;

    let (status, _) = app
        .post_json("/api/v1/state/save", &json!({ "slot": "GameSave3" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(dir.path().join("GameSave3.nson").exists());
}
