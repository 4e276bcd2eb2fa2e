//! Runtime adapters
//!
//! Concrete [`beacon_core::Runtime`] implementations. Currently the Docker
//! daemon.

mod docker;

pub use docker::DockerRuntime;
