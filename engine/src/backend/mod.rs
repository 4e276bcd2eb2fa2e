//! Backend adapters
//!
//! Concrete [`beacon_core::Backend`] implementations shipped with the
//! engine: a line-oriented log sink, a JSON webhook sink, and the
//! [`Announcer`], which bridges events onto a TTL-based
//! [`beacon_core::Discovery`] store.

mod announce;
mod log;
mod webhook;

pub use announce::{Announcer, ServiceSource};
pub use log::LogBackend;
pub use webhook::WebhookBackend;
