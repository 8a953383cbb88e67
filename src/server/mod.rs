// HTTP server wiring: shared state, router construction, and binding.

pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::transcribe::TranscriptionClient;

/// Uploads are whole audio files; cap them well above typical song sizes.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Process-wide state, constructed once at startup and shared immutably
/// across requests.
pub struct AppState {
    pub config: AppConfig,
    pub transcriber: TranscriptionClient,
    /// Resolved once at startup: whether the beat/chroma stack can be
    /// constructed in this environment. When false, chord estimation and
    /// tempo metadata are skipped (never attempted per request).
    pub dsp_available: bool,
}

impl AppState {
    pub fn new(config: AppConfig, dsp_available: bool) -> Self {
        let transcriber = TranscriptionClient::new(
            config.api_key.clone(),
            config.model.clone(),
            config.api_base_url.clone(),
        );
        Self {
            config,
            transcriber,
            dsp_available,
        }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    // CORS is permissive: this service carries no credentials or cookies,
    // auth to the upstream model happens server-side.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(["content-type".parse().unwrap()])
        .allow_origin("*".parse::<HeaderValue>().unwrap());

    routes::api_routes()
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind the requested port (with nearby-port fallback) and serve until
/// the process exits.
pub async fn start_server(state: AppState) -> Result<(), String> {
    let port = state.config.port;
    let app = build_router(Arc::new(state));

    let addr = try_bind(port).await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;
    let actual_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local addr: {}", e))?;

    tracing::info!("listening on {}", actual_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Try the preferred port, then a few above it, then let the OS pick.
async fn try_bind(preferred_port: u16) -> Result<SocketAddr, String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
    if let Ok(listener) = tokio::net::TcpListener::bind(addr).await {
        drop(listener);
        return Ok(addr);
    }

    for offset in 1..=10u16 {
        let port = preferred_port.saturating_add(offset);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        if let Ok(listener) = tokio::net::TcpListener::bind(addr).await {
            drop(listener);
            tracing::warn!("port {} unavailable, using {}", preferred_port, port);
            return Ok(addr);
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], 0u16));
    if let Ok(listener) = tokio::net::TcpListener::bind(addr).await {
        let actual = listener.local_addr().map_err(|e| e.to_string())?;
        drop(listener);
        tracing::warn!(
            "all preferred ports unavailable, OS assigned port {}",
            actual.port()
        );
        return Ok(actual);
    }

    Err("Failed to bind to any port".to_string())
}
