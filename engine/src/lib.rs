//! beacon-engine - the event-routing engine behind beacon
//!
//! Beacon watches a container runtime and keeps one or more discovery
//! backends consistent with the live set of containers on a host.
//!
//! # Architecture
//!
//! ```text
//! Runtime ──► ingest channel ──► Engine ──► Routes (filter fan-out) ──► Backends
//!                                  │
//!                                  └─► heartbeat clock ──► TTL re-announce
//! ```
//!
//! The [`Engine`] is the single consumer of the runtime's event channel. It
//! owns the authoritative container state, deduplicates events, rewrites
//! stop events to carry the last known full container, and fans the result
//! out to every matching [`Route`]. When a heartbeat clock is configured,
//! ticks are multiplexed onto the same dispatch loop so state transitions
//! and TTL sweeps never overlap.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod backend;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod route;
pub mod runtime;

pub use backend::{Announcer, LogBackend, ServiceSource, WebhookBackend};
pub use config::{BackendConfig, Config, DockerConfig, HeartbeatConfig, RouteConfig};
pub use discovery::EtcdDiscovery;
pub use engine::Engine;
pub use route::Route;
pub use runtime::DockerRuntime;
