use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::audit::AuditLogger;
use crate::config::{Config, LimitsConfig};
use crate::http::connection::Connection;
use crate::server::handler::RequestHandler;
use crate::site::SiteRoot;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts connections and runs each one on its own task.
pub struct Server {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    limits: LimitsConfig,
}

impl Server {
    /// Validates the site and binds the listen address.
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let root = cfg.validate()?;
        let site = SiteRoot::new(root, &cfg.site);
        let audit = Arc::new(AuditLogger::new(&cfg.audit.dir));
        let handler = Arc::new(RequestHandler::new(site, audit, cfg.limits.clone()));

        let listener = TcpListener::bind(&cfg.server.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;

        Ok(Self {
            listener,
            handler,
            limits: cfg.limits.clone(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until accepting fails.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            addr = %self.local_addr()?,
            root = %self.handler.site().root().display(),
            "Listening"
        );

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Per-connection failures (e.g. reset before accept) are not fatal
                    error!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let limits = self.limits.clone();
            tokio::spawn(async move {
                let task = tokio::spawn(async move {
                    let mut conn = Connection::new(socket, peer.to_string(), handler, limits);
                    conn.run().await
                });

                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(%peer, "Connection error: {:#}", e),
                    Err(e) if e.is_panic() => error!(%peer, "Connection task panicked"),
                    Err(e) => error!(%peer, "Connection task failed: {}", e),
                }
            });
        }
    }
}

