//! The container data model
//!
//! A [`Container`] is a runtime-supplied record describing one running
//! container at a point in time. Containers are immutable once constructed;
//! an update is expressed as a new value with the same `id`. Deep copies are
//! plain [`Clone`]s (every field is owned) and structural equality is
//! field-wise `PartialEq`, so the engine's dedup compare and snapshot copies
//! fall out of the derives.

use crate::error::BeaconError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// IP protocol of a container port.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// The port speaks TCP.
    #[default]
    Tcp,
    /// The port speaks UDP.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Protocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Protocol::Udp)
        } else {
            Err(BeaconError::InvalidPort(s.to_string()))
        }
    }
}

/// Parse a `number[/protocol]` port string. The protocol defaults to tcp.
pub fn parse_port(s: &str) -> Result<(u16, Protocol), BeaconError> {
    let (number, protocol) = match s.split_once('/') {
        Some((number, protocol)) => (number, protocol.parse()?),
        None => (s, Protocol::Tcp),
    };
    let number = number
        .parse::<u16>()
        .map_err(|_| BeaconError::InvalidPort(s.to_string()))?;
    Ok((number, protocol))
}

/// One exposed port mapping on a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The host address the port is bound to.
    pub host_ip: String,
    /// The port on the host that maps to the container's port.
    pub host_port: u16,
    /// The port the container is listening on.
    pub container_port: u16,
    /// The protocol the port is configured for.
    pub protocol: Protocol,
}

impl Binding {
    /// The host-side address this binding exposes.
    pub fn address(&self) -> Address {
        Address {
            host: self.host_ip.clone(),
            port: self.host_port,
            protocol: self.protocol,
        }
    }
}

/// A single container belonging to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// The globally unique identifier of the container, assigned by the
    /// underlying runtime. Empty ids never participate in routing.
    pub id: String,

    /// The logical service the container belongs to, derived from its
    /// metadata by the runtime adapter.
    pub service: String,

    /// Label metadata attached to the container. Unordered.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Network port bindings, in an order stable within one snapshot.
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Container {
    /// A sparse container carrying only an id, as delivered with stop
    /// events. The engine replaces it with the last known full container
    /// before forwarding downstream.
    pub fn with_id(id: impl Into<String>) -> Self {
        Container {
            id: id.into(),
            ..Container::default()
        }
    }
}

/// A host/port pairing a published service can be reached at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Hostname or IP address.
    pub host: String,
    /// Host-side port number.
    pub port: u16,
    /// Protocol spoken on the port.
    pub protocol: Protocol,
}

impl Address {
    /// Parse a `host:port[/protocol]` string.
    pub fn parse(s: &str) -> Result<Self, BeaconError> {
        let (host, port) = s
            .split_once(':')
            .ok_or_else(|| BeaconError::InvalidService(s.to_string()))?;
        let (port, protocol) = parse_port(port)?;
        Ok(Address {
            host: host.to_string(),
            port,
            protocol,
        })
    }

    /// The address rendered without the protocol suffix.
    pub fn no_protocol(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.protocol)
    }
}

/// How a container publishes access to a particular service, in the legacy
/// `name:port[/protocol]` label form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Logical service name.
    pub name: String,
    /// Container-side port the service listens on.
    pub port: u16,
    /// Protocol of the service port.
    pub protocol: Protocol,
}

impl ServiceSpec {
    /// Parse a single `name:port[/protocol]` specification.
    pub fn parse(s: &str) -> Result<Self, BeaconError> {
        let (name, port) = s
            .split_once(':')
            .ok_or_else(|| BeaconError::InvalidService(s.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BeaconError::InvalidService(s.to_string()));
        }
        let (port, protocol) = parse_port(port.trim())?;
        Ok(ServiceSpec {
            name: name.to_string(),
            port,
            protocol,
        })
    }

    /// Parse a comma-separated list of specifications. Any bad entry fails
    /// the whole list; a container either publishes all of its declared
    /// services or none.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, BeaconError> {
        s.split(',').map(ServiceSpec::parse).collect()
    }
}
