//! TCP listener and accept loop.

use crate::ServerConfig;
use crate::connection::serve_connection;
use crate::driver::Registry;
use crate::outbox::ConnectionId;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Game server: one listener, one shared session registry, one task per
/// connection.
#[derive(Debug)]
pub struct GameServer {
    listener: TcpListener,
    registry: Registry,
    config: Arc<ServerConfig>,
}

impl GameServer {
    /// Binds the configured address with an empty registry.
    #[instrument(skip(config), fields(host = %config.host(), port = config.port()))]
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::with_registry(config, Registry::new()).await
    }

    /// Binds the configured address, sharing an existing registry.
    #[instrument(skip_all)]
    pub async fn with_registry(config: ServerConfig, registry: Registry) -> Result<Self> {
        let addr = config.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!(addr = %listener.local_addr()?, "Listening");
        Ok(Self {
            listener,
            registry,
            config: Arc::new(config),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Registry shared by every connection.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Accepts connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already being served keep running on their own tasks.
    #[instrument(skip_all)]
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        let mut next_connection: u64 = 1;

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let id = ConnectionId::from(next_connection);
            next_connection += 1;

            let registry = self.registry.clone();
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                serve_connection(stream, peer, id, registry, &config).await;
            });

            info!(active_sessions = self.registry.len(), "Accepted connection");
        }
    }
}
