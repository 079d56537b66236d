//! TCP accept loop: binds the configured port and spawns one session task
//! per incoming connection.

use crate::engine::CacheEngine;
use crate::session;
use crate::shutdown::Shutdown;
use crate::subscription::SubscriptionRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Binds `0.0.0.0:port`. Split from [`serve`] so the caller can fail fast on
/// a bad port before spawning the long-running accept loop.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    Ok(listener)
}

/// Accepts connections on `listener` until `shutdown` fires, spawning each
/// onto `tasks` so the caller can drain them on exit.
pub async fn serve(
    listener: TcpListener,
    engine: CacheEngine,
    registry: Arc<SubscriptionRegistry>,
    shutdown: Shutdown,
    tasks: &mut JoinSet<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("accept loop shutting down");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "accepted connection");
                        let engine = engine.clone();
                        let registry = Arc::clone(&registry);
                        let shutdown = shutdown.clone();
                        tasks.spawn(async move {
                            session::run(stream, engine, registry, shutdown).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}
