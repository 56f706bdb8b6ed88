//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use narrator_api::config::EngineConfig;
use narrator_api::routes;
use narrator_api::state::{AppState, EngineParts};
use narrator_core::presentation::NoopResourceLoader;
use narrator_core::repository::SaveSlotStore;
use narrator_playback::events::PlayerStatus;
use narrator_playback::library::ScriptLibrary;
use narrator_test_support::{FixedClock, InMemorySlotStore, RecordingPresenter};
use tower::ServiceExt;

/// Engine under test plus direct handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub presenter: Arc<RecordingPresenter>,
}

/// Builds the full app with in-memory scripts and slots and the given
/// scripts preloaded into the library.
pub fn build_test_app(scripts: &[(&str, &str)]) -> TestApp {
    build_test_app_with_slots(scripts, Arc::new(InMemorySlotStore::new()))
}

/// Same as [`build_test_app`] with a caller-chosen slot store.
pub fn build_test_app_with_slots(scripts: &[(&str, &str)], slots: Arc<dyn SaveSlotStore>) -> TestApp {
    let library = Arc::new(ScriptLibrary::new());
    for (name, source) in scripts {
        library.insert_source(name, source);
    }
    let presenter = Arc::new(RecordingPresenter::new());
    let state = AppState::new(EngineParts {
        config: EngineConfig::default(),
        library,
        presenter: presenter.clone(),
        resources: Arc::new(NoopResourceLoader),
        slots,
        clock: Arc::new(FixedClock::epoch()),
    })
    .unwrap();

    TestApp {
        router: routes::app(state.clone()),
        state,
        presenter,
    }
}

impl TestApp {
    /// Waits until the player halts for input.
    pub async fn wait_for_input(&self) {
        self.state
            .player
            .wait_until(|status| status == PlayerStatus::WaitingForInput)
            .await;
    }

    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        send(self.router.clone(), request).await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        send(self.router.clone(), request).await
    }

    pub async fn put_text(&self, uri: &str, text: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "text/plain")
            .body(Body::from(text.to_owned()))
            .unwrap();
        send(self.router.clone(), request).await
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap().status()
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}
