//! HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use super::handlers::SharedState;
use super::router::{create_health_router, create_router};

/// How often stale login failures are pruned.
const CLEANUP_INTERVAL_SECS: u64 = 600;

/// Web server for stagebox.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: SharedState,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(addr: SocketAddr, app_state: SharedState) -> Self {
        Self { addr, app_state }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Forget stale login failures in the background.
    ///
    /// Sessions are never swept here; they are dropped when an expired
    /// token is resolved.
    fn start_cleanup_task(state: SharedState) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                state.limiter().cleanup();
                tracing::debug!("Pruned stale login failures");
            }
        });
    }

    fn router(&self) -> axum::Router {
        create_router(self.app_state.clone()).merge(create_health_router())
    }

    /// Run the web server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.app_state.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.app_state.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
