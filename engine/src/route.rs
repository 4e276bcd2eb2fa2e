//! Routes - the fan-out unit
//!
//! A route pairs a [`Filter`] with a [`Backend`]. The engine iterates its
//! routes in declaration order and hands each matching route its own copy
//! of the event.

use beacon_core::{Backend, Container, Filter};
use std::sync::Arc;

/// A filter/backend pairing. Immutable for the engine's lifetime.
#[derive(Clone)]
pub struct Route {
    filter: Filter,
    backend: Arc<dyn Backend>,
}

impl Route {
    /// Create a route from the provided filter and backend. An empty
    /// filter routes every event to the backend.
    pub fn new(filter: Filter, backend: Arc<dyn Backend>) -> Self {
        Route { filter, backend }
    }

    /// True iff this route's filter matches the container.
    pub fn matches(&self, container: &Container) -> bool {
        self.filter.matches(container)
    }

    /// The backend this route delivers to.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The backend's name, for logging.
    pub fn name(&self) -> &str {
        self.backend.name()
    }
}
