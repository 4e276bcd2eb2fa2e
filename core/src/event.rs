//! Container lifecycle events

use crate::container::Container;
use crate::error::BeaconError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The thing that's happening to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Container started.
    Start,
    /// Container stopped.
    Stop,
    /// Container updated.
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "start"),
            Action::Stop => write!(f, "stop"),
            Action::Update => write!(f, "update"),
        }
    }
}

impl FromStr for Action {
    type Err = BeaconError;

    /// Parse a wire action string. Runtime adapters translate unknown
    /// actions into [`BeaconError::InvalidAction`] and drop the event; the
    /// engine itself only ever sees the three variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "update" => Ok(Action::Update),
            other => Err(BeaconError::InvalidAction(other.to_string())),
        }
    }
}

/// Indicates that the status of a container changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The action that triggered this event.
    pub action: Action,
    /// The container affected by this event. For [`Action::Stop`] the
    /// runtime may deliver only the id; the engine fills in the last known
    /// full container before forwarding.
    pub container: Container,
}

impl Event {
    /// Create a new event.
    pub fn new(action: Action, container: Container) -> Self {
        Event { action, container }
    }
}
