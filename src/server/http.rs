use super::handlers::{command_handler, command_value_handler, index_handler};
use crate::config::ServerConfig;
use crate::error::{CcdError, Result};
use crate::facade::CommandFacade;
use axum::{
    routing::{any, get},
    Router,
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP binding of the command façade
pub struct CommandServer {
    pub(crate) config: ServerConfig,
    pub(crate) facade: CommandFacade,
}

impl CommandServer {
    pub fn new(config: ServerConfig, facade: CommandFacade) -> Self {
        Self { config, facade }
    }

    /// `/`, `/{command}` and `/{command}/{value}` for any method
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/:command", any(command_handler))
            .route("/:command/", any(command_handler))
            .route("/:command/:value", any(command_value_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.facade.clone())
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!("{}:{}", self.config.ip, self.config.port);
        info!("Starting command server on {}", addr);

        TcpListener::bind(&addr).await.map_err(|e| {
            CcdError::system(format!("Failed to bind command server to {}: {}", addr, e))
        })
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("Command server listening on {}", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CcdError::system(format!("Command server error: {}", e)))
    }
}

/// Builder for [`CommandServer`]
pub struct CommandServerBuilder {
    config: Option<ServerConfig>,
    facade: Option<CommandFacade>,
}

impl CommandServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            facade: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn facade(mut self, facade: CommandFacade) -> Self {
        self.facade = Some(facade);
        self
    }

    pub fn build(self) -> Result<CommandServer> {
        let config = self
            .config
            .ok_or_else(|| CcdError::system("Server configuration is required"))?;
        let facade = self
            .facade
            .ok_or_else(|| CcdError::system("Command facade is required"))?;

        Ok(CommandServer::new(config, facade))
    }
}

impl Default for CommandServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
