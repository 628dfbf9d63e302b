//! Request loop for the portal.
//!
//! This module runs the HTTP router and the heartbeat side by side on one
//! task:
//! - Serving requests
//! - Toggling the heartbeat indicator between requests
//! - Stopping on a shutdown signal

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use meterstyle_providers::Heartbeat;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Configuration for the portal server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Heartbeat toggle period.
    pub heartbeat: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            heartbeat: Duration::from_millis(1000),
        }
    }
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// The portal HTTP server.
pub struct PortalServer {
    config: ServerConfig,
    router: Router,
    heartbeat: Box<dyn Heartbeat>,
}

impl PortalServer {
    pub fn new(config: ServerConfig, router: Router, heartbeat: Box<dyn Heartbeat>) -> Self {
        Self {
            config,
            router,
            heartbeat,
        }
    }

    /// Run until Ctrl+C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await
    }

    /// Run until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local = listener.local_addr().unwrap_or(addr);
        info!("Portal listening on {}", local);

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F>(mut self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let server = axum::serve(listener, self.router).into_future();
        tokio::pin!(server);
        tokio::pin!(shutdown);

        let mut heartbeat = tokio::time::interval(self.config.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = &mut server => {
                    return result.map_err(ServerError::Serve);
                }
                _ = heartbeat.tick() => {
                    self.heartbeat.toggle();
                }
                _ = &mut shutdown => {
                    info!("Portal stopped");
                    return Ok(());
                }
            }
        }
    }
}
