//! Backend trait for beacon event sinks
//!
//! The [`Backend`] trait defines the interface for delivering container
//! events to external destinations. Backends are the output side of the
//! beacon pipeline.

use crate::error::BackendError;
use crate::event::Event;
use async_trait::async_trait;

/// Backend - receives events routed to it by the engine.
///
/// Each backend forwards events to a specific destination. The engine fans
/// events out to every route whose filter matches, in route declaration
/// order.
///
/// # Implementation Requirements
///
/// - Backends must be `Send + Sync` for use across async tasks.
/// - `process_event` runs on the engine's dispatch loop and must not block;
///   long writes belong behind the adapter's own buffering.
/// - Errors are advisory: the engine logs them and keeps going. They never
///   roll back engine state.
/// - The backend only ever sees events the engine has already deduplicated.
///
/// # Example
///
/// ```ignore
/// use beacon_core::{Backend, BackendError, Event};
/// use async_trait::async_trait;
///
/// struct BusBackend {
///     client: bus::Client,
///     topic: String,
/// }
///
/// #[async_trait]
/// impl Backend for BusBackend {
///     fn name(&self) -> &str {
///         "bus"
///     }
///
///     async fn process_event(&self, event: Event) -> Result<(), BackendError> {
///         let body = serde_json::to_vec(&event)
///             .map_err(|e| BackendError::Send(e.to_string()))?;
///         self.client.publish(&self.topic, body).await
///             .map_err(|e| BackendError::Send(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    /// The backend's name, for identification in logs.
    fn name(&self) -> &str;

    /// Handle one event. The event is the backend's own deep copy; it may
    /// be retained or consumed freely.
    async fn process_event(&self, event: Event) -> Result<(), BackendError>;

    /// Refresh whatever the backend has published.
    ///
    /// Driven by the engine's heartbeat clock when one is configured.
    /// Backends with nothing to keep alive take the default no-op.
    async fn heartbeat(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Free any resources associated with the backend. Called once by the
    /// engine after the event stream ends, in route declaration order.
    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
