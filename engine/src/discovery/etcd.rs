//! etcd discovery adapter
//!
//! Announces services into etcd. Each announcement grants a lease for the
//! TTL and writes `prefix/service/container = address` bound to it, so
//! entries disappear on their own when heartbeats stop; shutdown deletes
//! the key immediately.

use async_trait::async_trait;
use beacon_core::{Address, BackendError, Discovery};
use etcd_client::{Client, PutOptions};
use std::time::Duration;
use tracing::debug;

/// A [`Discovery`] store backed by etcd.
pub struct EtcdDiscovery {
    client: Client,
    prefix: String,
    protocol: bool,
}

impl EtcdDiscovery {
    /// Connect to the given etcd endpoints. Keys live under `prefix`;
    /// `protocol` controls whether values carry the `/tcp` suffix.
    pub async fn connect(
        endpoints: &[String],
        prefix: &str,
        protocol: bool,
    ) -> Result<Self, BackendError> {
        let client = Client::connect(endpoints, None)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        Ok(EtcdDiscovery {
            client,
            prefix: prefix.trim_matches('/').to_string(),
            protocol,
        })
    }

    fn key(&self, name: &str, container_id: &str) -> String {
        join_key(&self.prefix, name, container_id)
    }
}

/// Join etcd path segments, skipping empty ones.
fn join_key(prefix: &str, name: &str, container_id: &str) -> String {
    let mut path = String::new();
    for part in [prefix, name, container_id] {
        let part = part.trim_matches('/');
        if !part.is_empty() {
            path.push('/');
            path.push_str(part);
        }
    }
    path
}

#[async_trait]
impl Discovery for EtcdDiscovery {
    async fn announce(
        &self,
        name: &str,
        container_id: &str,
        address: &Address,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        let key = self.key(name, container_id);
        let value = if self.protocol {
            address.to_string()
        } else {
            address.no_protocol()
        };

        // etcd clients share one channel; clones are cheap handles
        let mut client = self.client.clone();
        let lease = client
            .lease_grant(ttl.as_secs().max(1) as i64, None)
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        client
            .put(
                key.clone(),
                value.clone(),
                Some(PutOptions::new().with_lease(lease.id())),
            )
            .await
            .map_err(|e| BackendError::Send(e.to_string()))?;

        debug!(%key, %value, "etcd set successful");
        Ok(())
    }

    async fn shutdown(&self, name: &str, container_id: &str) -> Result<(), BackendError> {
        let key = self.key(name, container_id);
        let mut client = self.client.clone();
        client
            .delete(key.clone(), None)
            .await
            .map_err(|e| BackendError::Send(e.to_string()))?;

        debug!(%key, "etcd rm successful");
        Ok(())
    }
}
