//! Cooperative shutdown: one cancellation signal, handed to every long-lived
//! task, with a bounded drain before the process exits.
//!
//! `tokio_util::sync::CancellationToken` is a clonable, `Send + Sync` signal
//! that composes with `tokio::select!` at every suspension point (accept,
//! socket read/write, sweep sleep) — the idiomatic choice here over a
//! hand-rolled `AtomicBool` + `Notify` pair.

use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The bound on how long a graceful shutdown waits for spawned tasks (the
/// accept loop, every session, the expiration sweep) to notice cancellation
/// and exit on their own before the process gives up waiting on them.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared shutdown coordinator.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Creates a fresh, not-yet-triggered coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A future that resolves once [`Self::trigger`] has been called.
    /// `tokio::select!` this against a task's normal suspension point (accept,
    /// socket read/write, sweep sleep) to make it cancellation-aware.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Whether shutdown has already been triggered.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signals every clone of this coordinator to stop.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Awaits every task in `tasks`, up to [`DRAIN_TIMEOUT`]. Tasks still
    /// outstanding after the timeout are abandoned (and, since they hold a
    /// clone of this token, should already be mid-exit) rather than awaited
    /// forever — a session wedged on a misbehaving peer must not block
    /// process exit.
    pub async fn drain(mut tasks: JoinSet<()>) {
        let _ = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
