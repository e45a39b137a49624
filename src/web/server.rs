//! Chat HTTP server with axum router and graceful shutdown.

use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ServerError;
use super::handlers::{get_index, post_chat, post_teach, AppState};
use crate::config::ServerConfig;

/// HTTP front end for the knowledge base.
pub struct ChatServer {
    config: ServerConfig,
    state: AppState,
    cancel: CancellationToken,
}

impl ChatServer {
    /// Create a server for `knowledge_file` with default configuration.
    #[must_use]
    pub fn new(knowledge_file: PathBuf) -> Self {
        Self {
            config: ServerConfig::default(),
            state: AppState::new(knowledge_file),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Token that stops the server when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/", get(get_index))
            .route("/chat", post(post_chat))
            .route("/teach", post(post_teach))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind to the configured address and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), ServerError> {
        let address = self.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.build_router();
        let cancel = self.cancel.clone();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                knowledge = %self.state.knowledge_file.display(),
                "Starting chat server"
            );
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Chat server shutting down gracefully");
            })
            .await
            .map_err(ServerError::Serve)
    }
}
