//! Shared doubles for engine integration tests: a channel-backed runtime,
//! an event-capturing backend and a recording discovery store.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use beacon_core::{
    Address, Backend, BackendError, BeaconError, Binding, Container, Discovery, Event, Protocol,
    Runtime,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// A runtime fed by the test. Closing it drops the sender, ending the
/// stream the way a real runtime does.
pub struct MockRuntime {
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(16);
        Arc::new(MockRuntime {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        })
    }

    pub async fn send(&self, event: Event) {
        let tx = self.tx.lock().clone();
        if let Some(tx) = tx {
            tx.send(event).await.unwrap();
        }
    }
}

#[async_trait]
impl Runtime for MockRuntime {
    async fn emit_events(&self) -> Result<mpsc::Receiver<Event>, BeaconError> {
        self.rx
            .lock()
            .take()
            .ok_or_else(|| BeaconError::RuntimeStart("events already emitted".to_string()))
    }

    async fn close(&self) -> Result<(), BeaconError> {
        self.tx.lock().take();
        Ok(())
    }
}

/// A runtime that refuses to open its stream.
pub struct BrokenRuntime;

#[async_trait]
impl Runtime for BrokenRuntime {
    async fn emit_events(&self) -> Result<mpsc::Receiver<Event>, BeaconError> {
        Err(BeaconError::RuntimeStart("socket unavailable".to_string()))
    }

    async fn close(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

/// A backend that captures every event it is handed.
pub struct CaptureBackend {
    name: &'static str,
    events: Mutex<Vec<Event>>,
    notify: Notify,
    closed: AtomicBool,
    received_after_close: AtomicBool,
}

impl CaptureBackend {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(CaptureBackend {
            name,
            events: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            received_after_close: AtomicBool::new(false),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn received_after_close(&self) -> bool {
        self.received_after_close.load(Ordering::SeqCst)
    }

    /// Wait until `n` events have arrived and return them all. Panics on
    /// timeout.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> Vec<Event> {
        let waited = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.events.lock().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "timed out waiting for {n} events, have {}",
            self.events.lock().len()
        );
        self.events()
    }
}

#[async_trait]
impl Backend for CaptureBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn process_event(&self, event: Event) -> Result<(), BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            self.received_after_close.store(true, Ordering::SeqCst);
        }
        self.events.lock().push(event);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A backend that fails every call.
pub struct FailingBackend;

#[async_trait]
impl Backend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn process_event(&self, _event: Event) -> Result<(), BackendError> {
        Err(BackendError::Send("intentional failure".to_string()))
    }

    async fn close(&self) -> Result<(), BackendError> {
        Err(BackendError::Shutdown("intentional failure".to_string()))
    }
}

/// A discovery store that records announcements and shutdowns.
#[derive(Default)]
pub struct RecordingDiscovery {
    pub announces: Mutex<Vec<(String, String, Address, Duration)>>,
    pub shutdowns: Mutex<Vec<(String, String)>>,
    pub closed: AtomicBool,
}

#[async_trait]
impl Discovery for RecordingDiscovery {
    async fn announce(
        &self,
        name: &str,
        container_id: &str,
        address: &Address,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        self.announces.lock().push((
            name.to_string(),
            container_id.to_string(),
            address.clone(),
            ttl,
        ));
        Ok(())
    }

    async fn shutdown(&self, name: &str, container_id: &str) -> Result<(), BackendError> {
        self.shutdowns
            .lock()
            .push((name.to_string(), container_id.to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A fully-populated container in the shape the scenarios use.
pub fn example_container(id: &str, labels: &[(&str, &str)]) -> Container {
    Container {
        id: id.to_string(),
        service: "example".to_string(),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        bindings: vec![
            Binding {
                host_ip: "127.0.0.1".to_string(),
                host_port: 56291,
                container_port: 80,
                protocol: Protocol::Tcp,
            },
            Binding {
                host_ip: "127.0.0.1".to_string(),
                host_port: 56292,
                container_port: 443,
                protocol: Protocol::Tcp,
            },
        ],
    }
}

/// Compare two container sets regardless of order.
pub fn assert_same_containers(mut have: Vec<Container>, mut want: Vec<Container>) {
    have.sort_by(|a, b| a.id.cmp(&b.id));
    want.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(have, want);
}

/// Build a label map from pairs.
pub fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
