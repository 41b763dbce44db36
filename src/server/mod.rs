//! HTTP API serving the chat widget.

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::llm::{SpeechSynthesizer, TextGenerator};

/// Build the API router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;
    let timeout = server.request_timeout();

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(move |req: Request, next: Next| async move {
            match tokio::time::timeout(timeout, next.run(req)).await {
                Ok(res) => res,
                Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
            }
        }))
        .layer(DefaultBodyLimit::max(server.body_limit_bytes));

    let app = Router::new()
        .route("/api/chat", post(handlers::api_chat))
        .route("/api/generate", post(handlers::api_generate))
        .route("/api/voices", get(handlers::api_voices))
        .route("/api/generate-speech", post(handlers::api_generate_speech))
        .route("/api/chat-with-speech", post(handlers::api_chat_with_speech))
        .layer(middleware);

    // Lets a widget page served from another origin call the API
    let app = if server.cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    app.with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(
    config: Arc<AppConfig>,
    generator: Arc<dyn TextGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %config.gemini.base_url,
        model = %generator.model(),
        tts_model = %config.gemini.tts_model,
        "Gemini configuration loaded"
    );

    let addr = config.server.address();
    let listener = TcpListener::bind(&addr).await?;

    serve(
        listener,
        AppState {
            generator,
            speech,
            config,
        },
    )
    .await
}

/// Serve the API on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(state);

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
