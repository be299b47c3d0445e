mod iwconfig;
mod node;
mod watch;
mod webhook;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::activity::NotificationPayload;

pub use iwconfig::IwconfigProbe;
pub use node::FsNodeInspector;
pub use watch::DeviceWatch;
pub use webhook::WebhookSink;

pub trait NetworkProbe {
    //Names of all wireless networks the host is currently associated with
    async fn associated_networks(&self) -> anyhow::Result<Vec<String>>;
}

pub trait NodeInspector {
    async fn last_accessed(&self, path: &Path) -> anyhow::Result<DateTime<Utc>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

pub trait NotificationSink {
    //Err only if no response was received at all
    async fn deliver(&self, payload: &NotificationPayload) -> anyhow::Result<DeliveryResponse>;
}
