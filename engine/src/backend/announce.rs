//! TTL announcer
//!
//! Bridges container events onto a TTL-based [`Discovery`] store. The
//! announcer owns the map of published `(service, container)` addresses,
//! announces new or changed addresses as events arrive, re-announces the
//! whole set on every heartbeat so entries outlive their TTLs, and shuts
//! entries down when their containers stop.

use async_trait::async_trait;
use beacon_core::{
    Action, Address, Backend, BackendError, Container, Discovery, Event, ServiceSpec,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Uniquely identifies a published service address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ServiceKey {
    name: String,
    container: String,
}

/// Where the announcer finds a container's published services.
#[derive(Debug, Clone)]
pub enum ServiceSource {
    /// Publish the container's service name at its first port binding.
    ServiceName,
    /// Parse a `name:port[/protocol],...` list from the named label and
    /// resolve each entry against the container's port bindings.
    SpecLabel(String),
}

/// A backend that keeps a [`Discovery`] store in sync with running
/// containers.
///
/// Entries are announced with `ttl = heartbeat interval + grace`, so a
/// missed heartbeat leaves `grace` before the store may reap them. The
/// engine's heartbeat clock should run at the same interval.
pub struct Announcer {
    discovery: Arc<dyn Discovery>,
    ttl: Duration,
    source: ServiceSource,
    services: Mutex<HashMap<ServiceKey, Address>>,
}

impl Announcer {
    /// Create an announcer for the given discovery store. `interval` must
    /// match the engine's heartbeat interval; `grace` is how long entries
    /// stay visible after a missed heartbeat.
    pub fn new(discovery: Arc<dyn Discovery>, interval: Duration, grace: Duration) -> Self {
        Announcer {
            discovery,
            ttl: interval + grace,
            source: ServiceSource::ServiceName,
            services: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different service derivation rule.
    pub fn with_source(mut self, source: ServiceSource) -> Self {
        self.source = source;
        self
    }

    /// The services a container publishes, as `(name, address)` pairs.
    fn container_services(&self, container: &Container) -> Vec<(String, Address)> {
        match &self.source {
            ServiceSource::ServiceName => match container.bindings.first() {
                Some(binding) => vec![(container.service.clone(), binding.address())],
                None => {
                    debug!(id = %container.id, "container published no services");
                    Vec::new()
                }
            },
            ServiceSource::SpecLabel(label) => {
                let Some(value) = container.labels.get(label) else {
                    debug!(id = %container.id, "container published no services");
                    return Vec::new();
                };
                let specs = match ServiceSpec::parse_list(value) {
                    Ok(specs) => specs,
                    Err(error) => {
                        warn!(id = %container.id, %error, "invalid service specification");
                        return Vec::new();
                    }
                };
                specs
                    .into_iter()
                    .filter_map(|spec| {
                        let binding = container.bindings.iter().find(|binding| {
                            binding.container_port == spec.port
                                && binding.protocol == spec.protocol
                        });
                        match binding {
                            Some(binding) => Some((spec.name, binding.address())),
                            None => {
                                warn!(
                                    id = %container.id,
                                    service = %spec.name,
                                    port = spec.port,
                                    "service port is not bound"
                                );
                                None
                            }
                        }
                    })
                    .collect()
            }
        }
    }

    /// Publish a container's services, announcing new or changed
    /// addresses and shutting down keys the container no longer derives.
    async fn add(&self, container: &Container) {
        let derived = self.container_services(container);

        let (stale, changed) = {
            let mut services = self.services.lock();

            let names: HashSet<&str> = derived.iter().map(|(name, _)| name.as_str()).collect();
            let stale: Vec<ServiceKey> = services
                .keys()
                .filter(|key| key.container == container.id && !names.contains(key.name.as_str()))
                .cloned()
                .collect();
            for key in &stale {
                services.remove(key);
            }

            let mut changed = Vec::new();
            for (name, address) in derived {
                let key = ServiceKey {
                    name,
                    container: container.id.clone(),
                };
                if services.get(&key) != Some(&address) {
                    services.insert(key.clone(), address.clone());
                    changed.push((key, address));
                }
            }
            (stale, changed)
        };

        for key in stale {
            self.shutdown_key(&key).await;
        }
        for (key, address) in changed {
            self.announce_key(&key, &address).await;
        }
    }

    /// Withdraw every service a container publishes.
    async fn remove(&self, container: &Container) {
        let keys: Vec<ServiceKey> = {
            let mut services = self.services.lock();
            let keys: Vec<ServiceKey> = services
                .keys()
                .filter(|key| key.container == container.id)
                .cloned()
                .collect();
            for key in &keys {
                services.remove(key);
            }
            keys
        };

        for key in keys {
            self.shutdown_key(&key).await;
        }
    }

    /// Announce one key; failures are logged and retried by the next
    /// heartbeat because the address stays in the map.
    async fn announce_key(&self, key: &ServiceKey, address: &Address) {
        if let Err(error) = self
            .discovery
            .announce(&key.name, &key.container, address, self.ttl)
            .await
        {
            warn!(service = %key.name, container = %key.container, %error, "announce failed");
        }
    }

    async fn shutdown_key(&self, key: &ServiceKey) {
        if let Err(error) = self.discovery.shutdown(&key.name, &key.container).await {
            warn!(service = %key.name, container = %key.container, %error, "shutdown failed");
        }
    }
}

#[async_trait]
impl Backend for Announcer {
    fn name(&self) -> &str {
        "announcer"
    }

    async fn process_event(&self, event: Event) -> Result<(), BackendError> {
        match event.action {
            Action::Start | Action::Update => self.add(&event.container).await,
            Action::Stop => self.remove(&event.container).await,
        }
        Ok(())
    }

    /// Re-announce every known service so TTLs keep being pushed out.
    async fn heartbeat(&self) -> Result<(), BackendError> {
        let snapshot: Vec<(ServiceKey, Address)> = {
            let services = self.services.lock();
            services
                .iter()
                .map(|(key, address)| (key.clone(), address.clone()))
                .collect()
        };

        for (key, address) in snapshot {
            self.announce_key(&key, &address).await;
        }
        Ok(())
    }

    /// Shut down everything still published, then close the store client.
    async fn close(&self) -> Result<(), BackendError> {
        let keys: Vec<ServiceKey> = {
            let mut services = self.services.lock();
            services.drain().map(|(key, _)| key).collect()
        };
        for key in keys {
            self.shutdown_key(&key).await;
        }
        self.discovery.close().await
    }
}
