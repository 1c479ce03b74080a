use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use beerpong_protocol::SensorState;
use beerpong_store::ScoreStore;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::game::GameState;
use crate::routes;

/// Default HTTP port.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub sensor: SensorState,
    pub store: Arc<dyn ScoreStore>,
    pub game: GameState,
    pub version: String,
}

impl AppState {
    /// Create handler state around a sensor reading and a score store.
    pub fn new(sensor: SensorState, store: Arc<dyn ScoreStore>) -> Self {
        Self {
            sensor,
            store,
            game: GameState::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version reported by `/version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to listen on.
    pub listen: SocketAddr,
    /// Front-end files served for paths outside the API.
    pub public_html: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT)),
            public_html: None,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, config: &HttpConfig) -> Router {
    let api = Router::new()
        .route("/version", get(routes::version))
        .route("/status", get(routes::status))
        .route("/begin", post(routes::begin))
        .route("/end", post(routes::end))
        .with_state(state);

    let app = match &config.public_html {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
}

/// Serve `app` on `addr` until `shutdown` resolves.
pub async fn serve<S>(addr: SocketAddr, app: Router, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "HTTP server running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
