//! Docker runtime adapter
//!
//! Translates Docker daemon events into beacon events. On stream open the
//! adapter synthesizes a start event for every already-running container so
//! the engine can rebuild its state; after that it follows the daemon's
//! container start/stop/die notifications.
//!
//! Containers are observable only when they carry the configured service
//! label; everything else is invisible to beacon. Ports bound to `0.0.0.0`
//! are rewritten to the configured host IP before publication.

use async_trait::async_trait;
use beacon_core::{container, Action, BeaconError, Binding, Container, Event, Runtime};
use bollard::container::ListContainersOptions;
use bollard::models::ContainerInspectResponse;
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Capacity of the event channel handed to the engine. Small on purpose:
/// the engine is the sole consumer and backpressure onto the daemon
/// listener is harmless.
const EVENT_BUFFER: usize = 16;

/// A beacon runtime for the Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
    host_ip: String,
    service_label: String,
    stop: watch::Sender<bool>,
}

impl DockerRuntime {
    /// Create a Docker runtime listening on `socket`.
    ///
    /// `host_ip` is reported as the address of ports bound to all host
    /// interfaces. `service_label` names the container label holding the
    /// service name; containers without it are ignored.
    pub fn connect(
        socket: &str,
        host_ip: &str,
        service_label: &str,
    ) -> Result<Self, BeaconError> {
        if host_ip.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "host ip may not be empty".to_string(),
            ));
        }
        if service_label.is_empty() {
            return Err(BeaconError::InvalidArgument(
                "service label may not be empty".to_string(),
            ));
        }

        let docker = if socket.starts_with("unix://") {
            Docker::connect_with_unix(socket, 120, API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(socket, 120, API_DEFAULT_VERSION)
        }
        .map_err(|e| BeaconError::RuntimeStart(e.to_string()))?;

        let (stop, _) = watch::channel(false);
        Ok(DockerRuntime {
            docker,
            host_ip: host_ip.to_string(),
            service_label: service_label.to_string(),
            stop,
        })
    }

    async fn inspect(&self, id: &str) -> Option<Container> {
        match self.docker.inspect_container(id, None).await {
            Ok(detail) => convert_container(detail, &self.host_ip, &self.service_label),
            Err(error) => {
                warn!(%id, %error, "failed to inspect container");
                None
            }
        }
    }

    /// The currently-running containers that carry the service label.
    async fn list_running(&self) -> Vec<Container> {
        let options = ListContainersOptions::<String> {
            filters: HashMap::from([(
                "status".to_string(),
                vec!["running".to_string()],
            )]),
            ..Default::default()
        };

        let summaries = match self.docker.list_containers(Some(options)).await {
            Ok(summaries) => summaries,
            Err(error) => {
                warn!(%error, "failed to list running containers");
                return Vec::new();
            }
        };

        let mut containers = Vec::new();
        for summary in summaries {
            let Some(id) = summary.id else { continue };
            if let Some(container) = self.inspect(&id).await {
                containers.push(container);
            }
        }
        containers
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn emit_events(&self) -> Result<mpsc::Receiver<Event>, BeaconError> {
        // subscribe before the initial sweep so containers starting during
        // the sweep are not lost; the engine dedups any overlap
        let options = EventsOptions::<String> {
            filters: HashMap::from([
                ("type".to_string(), vec!["container".to_string()]),
                (
                    "event".to_string(),
                    vec!["start".to_string(), "stop".to_string(), "die".to_string()],
                ),
            ]),
            ..Default::default()
        };
        let mut stream = self.docker.events(Some(options));

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let runtime = DockerRuntime {
            docker: self.docker.clone(),
            host_ip: self.host_ip.clone(),
            service_label: self.service_label.clone(),
            stop: self.stop.clone(),
        };
        let mut stop = self.stop.subscribe();

        tokio::spawn(async move {
            if *stop.borrow() {
                return;
            }

            for container in runtime.list_running().await {
                let event = Event::new(Action::Start, container);
                tokio::select! {
                    sent = tx.send(event) => if sent.is_err() { return },
                    _ = stop.changed() => return,
                }
            }

            loop {
                let message = tokio::select! {
                    received = stream.next() => match received {
                        Some(Ok(message)) => message,
                        Some(Err(error)) => {
                            warn!(%error, "docker event stream failed");
                            return;
                        }
                        None => return,
                    },
                    _ = stop.changed() => return,
                };

                let id = message
                    .actor
                    .and_then(|actor| actor.id)
                    .unwrap_or_default();
                if id.is_empty() {
                    continue;
                }

                let wire_action = message.action.unwrap_or_default();
                let action = match wire_action.as_str() {
                    "die" => Ok(Action::Stop),
                    other => Action::from_str(other),
                };

                let event = match action {
                    Ok(Action::Start) | Ok(Action::Update) => {
                        match runtime.inspect(&id).await {
                            Some(container) => Event::new(Action::Start, container),
                            None => continue,
                        }
                    }
                    Ok(Action::Stop) => Event::new(Action::Stop, Container::with_id(id)),
                    Err(error) => {
                        debug!(%error, "dropping container event");
                        continue;
                    }
                };

                tokio::select! {
                    sent = tx.send(event) => if sent.is_err() { return },
                    _ = stop.changed() => return,
                }
            }
        });

        Ok(rx)
    }

    async fn close(&self) -> Result<(), BeaconError> {
        // send_replace stores the value even when no producer task exists
        // yet, so closing before emit_events still takes effect
        self.stop.send_replace(true);
        Ok(())
    }
}

/// Convert an inspected container into the beacon model. Returns `None`
/// for containers beacon should not observe.
fn convert_container(
    detail: ContainerInspectResponse,
    host_ip: &str,
    service_label: &str,
) -> Option<Container> {
    let id = detail.id.unwrap_or_default();
    if id.is_empty() {
        return None;
    }

    let labels = detail
        .config
        .and_then(|config| config.labels)
        .unwrap_or_default();
    let Some(service) = labels.get(service_label).cloned() else {
        debug!(%id, "container has no service label, ignoring");
        return None;
    };

    let mut bindings = Vec::new();
    let ports = detail
        .network_settings
        .and_then(|settings| settings.ports)
        .unwrap_or_default();
    for (port_key, port_bindings) in ports {
        let (container_port, protocol) = match container::parse_port(&port_key) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(%id, %error, "skipping unparseable port");
                continue;
            }
        };
        for port_binding in port_bindings.unwrap_or_default() {
            let bound_ip = match port_binding.host_ip {
                Some(ip) if !ip.is_empty() && ip != "0.0.0.0" => ip,
                _ => host_ip.to_string(),
            };
            let Some(host_port) = port_binding
                .host_port
                .as_deref()
                .and_then(|port| port.parse::<u16>().ok())
            else {
                warn!(%id, port = %port_key, "skipping binding without a host port");
                continue;
            };
            bindings.push(Binding {
                host_ip: bound_ip,
                host_port,
                container_port,
                protocol,
            });
        }
    }

    // the ports map is unordered; sort so repeated inspections of an
    // unchanged container compare equal
    bindings.sort_by(|a, b| {
        (a.container_port, a.protocol, a.host_port, &a.host_ip).cmp(&(
            b.container_port,
            b.protocol,
            b.host_port,
            &b.host_ip,
        ))
    });

    Some(Container {
        id,
        service,
        labels,
        bindings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use beacon_core::Protocol;
    use bollard::models::{ContainerConfig, NetworkSettings, PortBinding};

    fn inspect_response(
        labels: &[(&str, &str)],
        ports: &[(&str, &str, &str)],
    ) -> ContainerInspectResponse {
        let port_map = ports
            .iter()
            .map(|(key, host_ip, host_port)| {
                (
                    key.to_string(),
                    Some(vec![PortBinding {
                        host_ip: Some(host_ip.to_string()),
                        host_port: Some(host_port.to_string()),
                    }]),
                )
            })
            .collect();

        ContainerInspectResponse {
            id: Some("123456".to_string()),
            config: Some(ContainerConfig {
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                ports: Some(port_map),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn containers_without_the_service_label_are_ignored() {
        let detail = inspect_response(&[("color", "blue")], &[]);
        assert!(convert_container(detail, "10.0.0.1", "service").is_none());
    }

    #[test]
    fn service_and_labels_are_carried_over() {
        let detail = inspect_response(&[("service", "www"), ("color", "blue")], &[]);
        let container = convert_container(detail, "10.0.0.1", "service").unwrap();

        assert_eq!(container.id, "123456");
        assert_eq!(container.service, "www");
        assert_eq!(container.labels.get("color"), Some(&"blue".to_string()));
    }

    #[test]
    fn wildcard_host_ip_is_rewritten() {
        let detail = inspect_response(
            &[("service", "www")],
            &[("80/tcp", "0.0.0.0", "56291"), ("443/tcp", "127.0.0.1", "56292")],
        );
        let container = convert_container(detail, "10.0.0.1", "service").unwrap();

        assert_eq!(
            container.bindings,
            vec![
                Binding {
                    host_ip: "10.0.0.1".to_string(),
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
            ]
        );
    }

    #[test]
    fn unparseable_ports_are_skipped() {
        let detail = inspect_response(
            &[("service", "www")],
            &[("80/tcp", "0.0.0.0", "56291"), ("bogus", "0.0.0.0", "56292")],
        );
        let container = convert_container(detail, "10.0.0.1", "service").unwrap();
        assert_eq!(container.bindings.len(), 1);
    }

    #[test]
    fn udp_ports_are_recognized() {
        let detail = inspect_response(&[("service", "dns")], &[("53/udp", "0.0.0.0", "53")]);
        let container = convert_container(detail, "10.0.0.1", "service").unwrap();
        assert_eq!(container.bindings[0].protocol, Protocol::Udp);
    }

    #[test]
    fn close_before_emit_events_is_safe() {
        let (stop, _) = watch::channel(false);
        stop.send_replace(true);
        // a receiver subscribed after the send still observes the value
        let rx = stop.subscribe();
        assert!(*rx.borrow());
    }
}
