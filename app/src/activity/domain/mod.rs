mod gate;

pub use gate::{CaptureNodePattern, is_settled};

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use derive_more::derive::{Display, Error};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl DeviceEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventKind {
    #[display("IN_OPEN")]
    Opened,
    #[display("IN_CLOSE_WRITE")]
    ClosedAfterWrite,
    #[display("OTHER")]
    Other,
}

impl EventKind {
    pub fn action(&self) -> Option<Action> {
        match self {
            EventKind::Opened => Some(Action::TurnOn),
            EventKind::ClosedAfterWrite => Some(Action::TurnOff),
            EventKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[display("turn_on")]
    TurnOn,
    #[display("turn_off")]
    TurnOff,
}

//
// ENTITY
//
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub struct EntityId(String);

#[derive(Debug, Display, Error)]
#[display("Invalid entity id '{value}', expected <domain>.<name>, e.g. input_boolean.mic_active")]
pub struct InvalidEntityId {
    pub value: String,
}

impl EntityId {
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map(|(domain, _)| domain).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = InvalidEntityId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, _)) if !domain.is_empty() => Ok(EntityId(s.to_string())),
            _ => Err(InvalidEntityId { value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub service: String,
    pub entity_id: String,
    pub action: Action,
}

impl NotificationPayload {
    pub fn new(entity_id: &EntityId, action: Action) -> Self {
        Self {
            service: entity_id.domain().to_string(),
            entity_id: entity_id.as_str().to_string(),
            action,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub webhook_url: String,
    pub entity_id: EntityId,
    pub required_network: Option<String>,
    pub minimum_age: Duration,
    pub device_root: PathBuf,
}
