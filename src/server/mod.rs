//! HTTP JSON API server
//!
//! Serves every analysis operation over axum with permissive CORS and
//! request tracing. When the external page store is configured, analyses and
//! recommendations are synced in the background after the response is built.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analyzer::KeywordAnalyzer;
use crate::config::{Config, ServerConfig};
use crate::storage::Exporter;
use crate::sync::SyncService;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<KeywordAnalyzer>,

    /// Present when the external store is configured and background sync is on
    pub sync: Option<Arc<SyncService>>,

    pub exporter: Exporter,

    pub start_time: Instant,
}

impl AppState {
    pub fn new(analyzer: KeywordAnalyzer, exporter: Exporter) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            sync: None,
            exporter,
            start_time: Instant::now(),
        }
    }

    pub fn with_sync(mut self, sync: SyncService) -> Self {
        self.sync = Some(Arc::new(sync));
        self
    }

    pub fn store_connected(&self) -> bool {
        self.sync.is_some()
    }
}

// ============================================================================
// Server
// ============================================================================

pub struct RadarServer {
    config: ServerConfig,
    state: AppState,
}

impl RadarServer {
    /// Build the analyzer, exporter and optional sync service from `config`
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        let analyzer =
            KeywordAnalyzer::from_config(config).map_err(|e| ServerError::Init(e.to_string()))?;
        let mut state = AppState::new(analyzer, Exporter::default());

        if config.server.background_sync && config.store.is_configured() {
            let sync =
                SyncService::notion(&config.store).map_err(|e| ServerError::Init(e.to_string()))?;
            state = state.with_sync(sync);
            tracing::info!("Background sync to the page store enabled");
        } else {
            tracing::info!("Page store not configured, background sync disabled");
        }

        Ok(Self::with_state(config.server.clone(), state))
    }

    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn build_router(&self) -> Router {
        create_router(self.state.clone())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(TraceLayer::new_for_http())
    }

    fn bind_address(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address: {e}")))
    }

    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.bind_address()?;

        tracing::info!(%addr, "Starting keyword-radar API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("API server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.history.enabled = false;
        config
    }

    #[test]
    fn test_server_without_store() {
        let server = RadarServer::new(&config()).unwrap();
        assert!(!server.state().store_connected());
    }

    #[test]
    fn test_server_with_store() {
        let mut config = config();
        config.store.api_token = Some("secret".to_string());
        config.store.databases.keyword_analysis = Some("kw".to_string());

        let server = RadarServer::new(&config).unwrap();
        assert!(server.state().store_connected());
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = config();
        config.server.host = "not a host".to_string();
        let server = RadarServer::new(&config).unwrap();
        assert!(matches!(server.bind_address(), Err(ServerError::Config(_))));
    }
}
