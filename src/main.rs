//! Process entry point: wires up logging, configuration, the engine, the
//! subscription fan-out, the listener, and the periodic expiration sweep,
//! then waits for `Ctrl-C` to drain everything and exit.

use cache_rs::{CacheEngine, Config, EventSink, Shutdown, SubscriptionRegistry};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(?config, "starting");

    let (sink, events) = EventSink::channel();
    let engine = CacheEngine::new(config.max_items, sink);
    let registry = Arc::new(SubscriptionRegistry::new());
    let shutdown = Shutdown::new();

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let registry = Arc::clone(&registry);
        async move { registry.run(events).await }
    });

    tasks.spawn({
        let engine = engine.clone();
        let shutdown = shutdown.clone();
        let interval = config.cleanup_interval;
        async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => engine.sweep_expired(),
                }
            }
        }
    });

    let listener = match cache_rs::listener::bind(config.port).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining");
        }
        () = cache_rs::listener::serve(listener, engine, Arc::clone(&registry), shutdown.clone(), &mut tasks) => {
            tracing::warn!("accept loop exited on its own");
        }
    }

    shutdown.trigger();
    Shutdown::drain(tasks).await;
    tracing::info!("shutdown complete");

    ExitCode::SUCCESS
}
