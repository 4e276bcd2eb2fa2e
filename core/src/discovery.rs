//! Discovery trait for TTL-based directories

use crate::container::Address;
use crate::error::BackendError;
use async_trait::async_trait;
use std::time::Duration;

/// A data store to which service announcements are made.
///
/// After `announce`, the store must keep the entry visible for at least
/// `ttl` from the most recent announcement; once `ttl` elapses without a
/// fresh announce the entry may be reaped. Re-announcing the same
/// `(name, container_id)` with an equal address and ttl is idempotent.
///
/// `shutdown` removes an entry immediately instead of waiting for its TTL
/// to expire.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Inform the store that `name` is hosted by `container_id` at
    /// `address`, valid for `ttl`.
    async fn announce(
        &self,
        name: &str,
        container_id: &str,
        address: &Address,
        ttl: Duration,
    ) -> Result<(), BackendError>;

    /// Inform the store that `container_id` no longer hosts `name`.
    async fn shutdown(&self, name: &str, container_id: &str) -> Result<(), BackendError>;

    /// Release any resources held by the store client.
    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
