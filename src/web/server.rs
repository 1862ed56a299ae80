//! HTTP server
//!
//! Binds the panel router and serves it until Ctrl+C.
//!
//! ## Running the Server
//!
//! ```bash
//! # Serve on the default 127.0.0.1:8080
//! trainpanel
//!
//! # Reachable from outside the VM
//! trainpanel --bind 0.0.0.0 --port 8080
//! ```

use std::sync::Arc;
use tokio::net::TcpListener;

use super::{router, AppState};
use crate::cloud::{Dashboard, JobClient};
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};

/// Control panel HTTP server
pub struct PanelServer {
    state: Arc<AppState>,
}

impl PanelServer {
    /// Create a server over the given collaborators
    pub fn new(
        config: PanelConfig,
        client: Arc<dyn JobClient>,
        dashboard: Arc<dyn Dashboard>,
    ) -> Self {
        Self {
            state: Arc::new(AppState::new(config, client, dashboard)),
        }
    }

    /// Get shared state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PanelError::config(format!("cannot bind {}: {}", addr, e)))?;

        tracing::info!(
            %addr,
            bucket = %self.state.config.bucket,
            region = %self.state.config.region,
            "control panel listening on http://{}",
            addr
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(PanelError::from)?;

        tracing::info!("control panel shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
