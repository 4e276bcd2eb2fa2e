//! Engine - the stateful dispatcher at the heart of beacon
//!
//! The engine pulls events from a [`Runtime`], maintains the authoritative
//! map of known containers, and fans deduplicated events out to its routes.
//!
//! # Example
//!
//! ```ignore
//! use beacon_engine::{Engine, Route};
//! use beacon_core::Filter;
//!
//! let engine = Engine::new(runtime, vec![
//!     Route::new(Filter::parse("color=blue")?, blue_backend),
//!     Route::new(Filter::default(), audit_backend),
//! ])?;
//! engine.run().await?;
//! ```

mod dispatcher;

use crate::route::Route;
use beacon_core::{BeaconError, Container, Filter, Runtime};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Processes events from a runtime into one or more backends, maintaining
/// state for every container it sees.
pub struct Engine {
    pub(crate) runtime: Arc<dyn Runtime>,
    pub(crate) routes: Vec<Route>,
    pub(crate) containers: Mutex<HashMap<String, Container>>,
    pub(crate) heartbeat: Option<Duration>,
}

impl Engine {
    /// Create an engine which receives events from `runtime` and uses
    /// `routes` to deliver them to the appropriate backends. Does not
    /// start the engine.
    ///
    /// Fails with [`BeaconError::InvalidArgument`] if `routes` is empty.
    pub fn new(runtime: Arc<dyn Runtime>, routes: Vec<Route>) -> Result<Self, BeaconError> {
        if routes.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "at least one route is required".to_string(),
            ));
        }
        Ok(Engine {
            runtime,
            routes,
            containers: Mutex::new(HashMap::new()),
            heartbeat: None,
        })
    }

    /// Enable the heartbeat clock. On every `interval` the engine asks
    /// each backend to refresh whatever it has published; overdue ticks
    /// are coalesced rather than replayed.
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    /// The list of containers the engine has discovered, as deep copies.
    /// An optional filter limits the result; each call's result is
    /// self-consistent but the ordering is unspecified.
    pub fn containers(&self, filter: Option<&Filter>) -> Vec<Container> {
        let containers = self.containers.lock();
        containers
            .values()
            .filter(|container| filter.map_or(true, |f| f.matches(container)))
            .cloned()
            .collect()
    }

    /// Stop a running engine. The runtime ends its stream, the dispatcher
    /// drains whatever is already in flight, closes every backend in route
    /// order and [`Engine::run`] returns.
    ///
    /// Idempotent, and safe to call before `run`: a subsequent `run`
    /// observes the closed stream and returns immediately.
    pub async fn close(&self) -> Result<(), BeaconError> {
        self.runtime.close().await
    }
}
