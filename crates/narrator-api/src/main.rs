//! Narrator API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use narrator_api::config::{EngineConfig, ServerSettings};
use narrator_api::error::AppError;
use narrator_api::routes;
use narrator_api::state::{AppState, EngineParts};
use narrator_core::clock::SystemClock;
use narrator_core::presentation::NoopResourceLoader;
use narrator_playback::library::ScriptLibrary;
use narrator_playback::presenter::TracingPresenter;
use narrator_slot_store::{FileSlotStore, SaveFormat};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Narrator API server");

    // Read configuration from environment.
    let settings = ServerSettings::from_env()?;
    let config = EngineConfig::load(settings.config_path.as_deref()).await?;
    let format = if config.state.binary_save_files {
        SaveFormat::Binary
    } else {
        SaveFormat::Json
    };
    tracing::info!(
        scripts = %settings.scripts_dir.display(),
        saves = %settings.saves_dir.display(),
        ?format,
        "engine configured"
    );

    // Build application state.
    let app_state = AppState::new(EngineParts {
        config,
        library: Arc::new(ScriptLibrary::with_root(&settings.scripts_dir)),
        presenter: Arc::new(TracingPresenter),
        resources: Arc::new(NoopResourceLoader),
        slots: Arc::new(FileSlotStore::new(&settings.saves_dir, format)),
        clock: Arc::new(SystemClock),
    })?;

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
