//! Tool server: listeners, connection lifecycle, graceful shutdown

pub mod router;
pub mod transport;

pub use router::{Router, Tool, ToolOutput};

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppResult;
use crate::protocol::ServerInfo;
use transport::ConnectionContext;

/// Minimal HTTP reply for the health probe listener
const HEALTH_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";

/// The tool server: an RPC accept loop plus a health probe listener
pub struct Server {
    config: ServerConfig,
    context: Arc<ConnectionContext>,
}

impl Server {
    /// Build a server around a fully registered router
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let context = Arc::new(ConnectionContext {
            router: Arc::new(router),
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tool_timeout: config.tool_timeout(),
        });
        Self { config, context }
    }

    /// Run until the shutdown signal flips, then drain within the grace period
    ///
    /// Connection tasks watch the same channel and stop between frames;
    /// a connection that stops mid-dispatch aborts its in-flight tool
    /// task, so the drain wait is capped at the configured grace period.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let rpc_listener = TcpListener::bind(self.config.rpc_addr()).await?;
        let health_listener = TcpListener::bind(self.config.health_addr()).await?;
        info!(
            rpc = %self.config.rpc_addr(),
            health = %self.config.health_addr(),
            tools = self.context.router.len(),
            "server listening"
        );

        let health_shutdown = shutdown.clone();
        let health_task = tokio::spawn(run_health_listener(health_listener, health_shutdown));

        let mut accept_shutdown = shutdown.clone();
        loop {
            tokio::select! {
                accepted = rpc_listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!(error = %err, "accept failed");
                            continue;
                        }
                    };
                    debug!(%peer, "connection accepted");
                    let ctx = self.context.clone();
                    let conn_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(err) =
                            transport::serve_connection(stream, ctx, conn_shutdown).await
                        {
                            warn!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                _ = accept_shutdown.changed() => {
                    info!("shutdown signal received, draining connections");
                    break;
                }
            }
        }

        // Bounded drain: connection tasks notice the watch flip between
        // frames and abort any dispatch still in flight; anything left
        // after the grace period is dropped with the process.
        tokio::time::sleep(self.config.shutdown_grace()).await;
        health_task.abort();
        info!("server stopped");
        Ok(())
    }
}

/// Answer every connection on the health port with a fixed 200 reply
async fn run_health_listener(listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((mut stream, _)) => {
                        tokio::spawn(async move {
                            use tokio::io::AsyncWriteExt;
                            if let Err(err) = stream.write_all(HEALTH_RESPONSE).await {
                                debug!(error = %err, "health reply failed");
                            }
                            let _ = stream.shutdown().await;
                        });
                    }
                    Err(err) => {
                        error!(error = %err, "health accept failed");
                    }
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}
