//! Runtime trait for container event sources

use crate::error::BeaconError;
use crate::event::Event;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A source of container lifecycle events.
///
/// Implementations speak to a concrete container daemon and translate its
/// notifications into [`Event`]s.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Open the event stream. Called exactly once by the engine.
    ///
    /// On the first deliveries the runtime must synthesize a start event
    /// for every already-running container it can observe, so the engine
    /// rebuilds its state without persistent storage. After that it must
    /// preserve per-container causal order (never a stop before its
    /// matching start). Duplicate starts and repeated equal updates are
    /// fine; the engine treats them as no-ops.
    ///
    /// The stream is finite: it ends when the runtime is closed or its
    /// connection is lost. It is not restartable.
    async fn emit_events(&self) -> Result<mpsc::Receiver<Event>, BeaconError>;

    /// End the event stream and release resources. Safe to call before
    /// `emit_events`, twice, or after the stream has already ended.
    async fn close(&self) -> Result<(), BeaconError>;
}
