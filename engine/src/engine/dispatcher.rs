//! The engine's dispatch loop
//!
//! One task owns everything: it is the sole consumer of the runtime's
//! event channel, the only writer of the container map, and the driver of
//! the heartbeat clock. Per-container ordering follows from that alone.

use super::Engine;
use beacon_core::{Action, BeaconError, Container, Event};
use std::collections::HashMap;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

impl Engine {
    /// Run the engine. Blocks until the runtime's event stream ends,
    /// normally because [`Engine::close`] was called.
    ///
    /// A runtime that refuses to open its stream fails the call with
    /// [`BeaconError::RuntimeStart`]; the caller should treat that as
    /// fatal. Backend failures are logged and swallowed.
    pub async fn run(&self) -> Result<(), BeaconError> {
        let mut events = self.runtime.emit_events().await?;

        info!(
            routes = self.routes.len(),
            heartbeat = ?self.heartbeat,
            "engine started"
        );

        let mut ticker = self.heartbeat.map(|interval| {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
                _ = next_tick(ticker.as_mut()) => self.heartbeat_sweep().await,
            }
        }

        info!("event stream ended, closing backends");
        for route in &self.routes {
            if let Err(error) = route.backend().close().await {
                warn!(backend = route.name(), %error, "backend close failed");
            }
        }
        Ok(())
    }

    /// Apply one incoming event to the container map and forward the
    /// effective event, if any, to every matching route.
    async fn dispatch(&self, incoming: Event) {
        let effective = {
            let mut containers = self.containers.lock();
            apply_transition(&mut containers, incoming)
        };

        let Some(event) = effective else { return };
        debug!(action = %event.action, id = %event.container.id, "dispatching event");

        for route in &self.routes {
            if !route.matches(&event.container) {
                continue;
            }
            if let Err(error) = route.backend().process_event(event.clone()).await {
                warn!(
                    backend = route.name(),
                    id = %event.container.id,
                    %error,
                    "backend rejected event"
                );
            }
        }
    }

    async fn heartbeat_sweep(&self) {
        debug!("heartbeat started");
        for route in &self.routes {
            if let Err(error) = route.backend().heartbeat().await {
                warn!(backend = route.name(), %error, "heartbeat failed");
            }
        }
        debug!("heartbeat complete");
    }
}

/// Wait for the next tick, or forever when no clock is configured.
async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// The authoritative transition rules.
///
/// Returns the event to forward downstream, or `None` when the incoming
/// event changed nothing:
///
/// - start/update of an unknown container stores it and emits a start;
/// - start/update of a known container emits an update only when the
///   container differs structurally, replacing the stored copy;
/// - stop of a known container removes it and emits a stop carrying the
///   stored container, not the (possibly sparse) incoming one;
/// - stop of an unknown container is a no-op.
fn apply_transition(
    containers: &mut HashMap<String, Container>,
    incoming: Event,
) -> Option<Event> {
    let Event { action, container } = incoming;
    if container.id.is_empty() {
        debug!("dropping event for container without an id");
        return None;
    }

    match action {
        Action::Start | Action::Update => match containers.get(&container.id) {
            None => {
                containers.insert(container.id.clone(), container.clone());
                Some(Event::new(Action::Start, container))
            }
            Some(existing) if *existing != container => {
                containers.insert(container.id.clone(), container.clone());
                Some(Event::new(Action::Update, container))
            }
            Some(_) => None,
        },
        Action::Stop => containers
            .remove(&container.id)
            .map(|stored| Event::new(Action::Stop, stored)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use beacon_core::{Binding, Protocol};
    use std::collections::HashMap;

    fn container(id: &str, label: (&str, &str)) -> Container {
        Container {
            id: id.to_string(),
            service: "example".to_string(),
            labels: HashMap::from([(label.0.to_string(), label.1.to_string())]),
            bindings: vec![Binding {
                host_ip: "127.0.0.1".to_string(),
                host_port: 56291,
                container_port: 80,
                protocol: Protocol::Tcp,
            }],
        }
    }

    #[test]
    fn first_start_is_stored_and_forwarded() {
        let mut state = HashMap::new();
        let event = Event::new(Action::Start, container("123", ("a", "aye")));

        let effective = apply_transition(&mut state, event.clone()).unwrap();
        assert_eq!(effective, event);
        assert_eq!(state.get("123"), Some(&container("123", ("a", "aye"))));
    }

    #[test]
    fn duplicate_start_is_suppressed() {
        let mut state = HashMap::new();
        let event = Event::new(Action::Start, container("123", ("a", "aye")));

        apply_transition(&mut state, event.clone()).unwrap();
        assert!(apply_transition(&mut state, event).is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn update_of_unknown_container_becomes_start() {
        let mut state = HashMap::new();
        let event = Event::new(Action::Update, container("123", ("a", "aye")));

        let effective = apply_transition(&mut state, event).unwrap();
        assert_eq!(effective.action, Action::Start);
    }

    #[test]
    fn differing_update_replaces_and_forwards() {
        let mut state = HashMap::new();
        apply_transition(
            &mut state,
            Event::new(Action::Start, container("123", ("a", "aye"))),
        );

        let changed = container("123", ("a", "eh"));
        let effective = apply_transition(
            &mut state,
            Event::new(Action::Update, changed.clone()),
        )
        .unwrap();
        assert_eq!(effective, Event::new(Action::Update, changed.clone()));
        assert_eq!(state.get("123"), Some(&changed));
    }

    #[test]
    fn equal_update_is_suppressed() {
        let mut state = HashMap::new();
        apply_transition(
            &mut state,
            Event::new(Action::Start, container("123", ("a", "aye"))),
        );

        let repeat = Event::new(Action::Update, container("123", ("a", "aye")));
        assert!(apply_transition(&mut state, repeat).is_none());
    }

    #[test]
    fn stop_forwards_the_stored_container() {
        let mut state = HashMap::new();
        let full = container("123", ("a", "aye"));
        apply_transition(&mut state, Event::new(Action::Start, full.clone()));

        // stop events may carry only the id
        let effective = apply_transition(
            &mut state,
            Event::new(Action::Stop, Container::with_id("123")),
        )
        .unwrap();
        assert_eq!(effective, Event::new(Action::Stop, full));
        assert!(state.is_empty());
    }

    #[test]
    fn stop_of_unknown_container_is_a_noop() {
        let mut state = HashMap::new();
        let stop = Event::new(Action::Stop, Container::with_id("123"));

        assert!(apply_transition(&mut state, stop.clone()).is_none());

        // and a second stop after a real one is equally silent
        apply_transition(
            &mut state,
            Event::new(Action::Start, container("123", ("a", "aye"))),
        );
        apply_transition(&mut state, stop.clone()).unwrap();
        assert!(apply_transition(&mut state, stop).is_none());
    }

    #[test]
    fn empty_id_is_dropped() {
        let mut state = HashMap::new();
        let event = Event::new(Action::Start, Container::default());

        assert!(apply_transition(&mut state, event).is_none());
        assert!(state.is_empty());
    }
}
