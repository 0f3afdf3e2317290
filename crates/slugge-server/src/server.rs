use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use slugge_engine::{AssistantConfig, ProcessingTracker};
use slugge_store::Database;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_origin);
    Router::new()
        .nest("/v1", handlers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS for the configured frontend origin, with credentials.
fn cors_layer(origin: &str) -> CorsLayer {
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
        Err(_) => {
            tracing::warn!(origin, "invalid frontend origin; cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}

/// Bind and serve. Returns a handle to shut it down.
pub async fn start(
    config: ServerConfig,
    db: Database,
    tracker: Arc<ProcessingTracker>,
    assistant_config: AssistantConfig,
) -> Result<ServerHandle, std::io::Error> {
    let addr = config.bind_addr();
    let state = AppState::new(config, db, tracker, assistant_config);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "slugge server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server terminated");
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        shutdown: Some(shutdown_tx),
        server,
    })
}

/// Handle returned by `start()`. Dropping it leaves the server running.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.server).await {
            tracing::warn!(error = %e, "server task ended abnormally");
        }
        tracing::info!("slugge server stopped");
    }
}
