use chrono::Utc;
use derive_more::derive::Display;
use infrastructure::meter;

use crate::activity::adapter::{DeliveryResponse, NetworkProbe, NodeInspector, NotificationSink};
use crate::activity::{CaptureNodePattern, DeviceEvent, FilterConfig, NotificationPayload, is_settled};

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Outcome {
    Discarded,
    #[display("ignored, not a capture device")]
    PathRejected,
    #[display("skipped, required network not connected")]
    NetworkRejected,
    #[display("skipped, device accessed too recently")]
    TooRecent,
    #[display("notified")]
    Notified,
    #[display("{_0}")]
    DeliveryFailed(String),
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Discarded => "discarded",
            Outcome::PathRejected => "path_rejected",
            Outcome::NetworkRejected => "network_rejected",
            Outcome::TooRecent => "too_recent",
            Outcome::Notified => "notified",
            Outcome::DeliveryFailed(_) => "delivery_failed",
        }
    }
}

/// Decides per device event whether it is a real microphone state change and
/// notifies Home Assistant if so. Holds no state between events; every gate
/// looks at freshly observed environment state.
pub struct TransitionFilter<N, I, S> {
    config: FilterConfig,
    pattern: CaptureNodePattern,
    probe: N,
    inspector: I,
    sink: S,
}

impl<N, I, S> TransitionFilter<N, I, S>
where
    N: NetworkProbe,
    I: NodeInspector,
    S: NotificationSink,
{
    pub fn new(config: FilterConfig, probe: N, inspector: I, sink: S) -> Self {
        let pattern = CaptureNodePattern::new(config.device_root.clone());

        Self {
            config,
            pattern,
            probe,
            inspector,
            sink,
        }
    }

    pub async fn handle(&self, event: DeviceEvent) -> Outcome {
        let outcome = self.evaluate(&event).await;

        if outcome != Outcome::Discarded {
            meter::increment("micwatch_events", &[("outcome", outcome.label())]);
        }

        outcome
    }

    #[tracing::instrument(name = "handle device event", skip(self, event), fields(path = %event.path.display(), kind = %event.kind))]
    async fn evaluate(&self, event: &DeviceEvent) -> Outcome {
        let Some(action) = event.kind.action() else {
            return Outcome::Discarded;
        };

        if !self.pattern.matches(&event.path) {
            tracing::debug!("Not a capture device: {}", event.path.display());
            return Outcome::PathRejected;
        }

        if !self.is_on_required_network().await {
            return Outcome::NetworkRejected;
        }

        if !self.is_settled(event).await {
            return Outcome::TooRecent;
        }

        let payload = NotificationPayload::new(&self.config.entity_id, action);
        let outcome = self.notify(&payload).await;

        match &outcome {
            Outcome::Notified => tracing::info!(
                "Received {} for path {}, HomeAssistant {}",
                event.kind,
                event.path.display(),
                outcome
            ),
            _ => tracing::warn!(
                "Received {} for path {}, HomeAssistant {}",
                event.kind,
                event.path.display(),
                outcome
            ),
        }

        outcome
    }

    async fn is_on_required_network(&self) -> bool {
        let Some(required) = &self.config.required_network else {
            return true;
        };

        match self.probe.associated_networks().await {
            Ok(networks) if networks.iter().any(|n| n == required) => true,
            Ok(_) => {
                tracing::info!("SSID {} not connected, HomeAssistant notification skipped", required);
                false
            }
            Err(e) => {
                tracing::warn!(
                    "Error querying wireless association, HomeAssistant notification skipped: {:?}",
                    e
                );
                false
            }
        }
    }

    async fn is_settled(&self, event: &DeviceEvent) -> bool {
        let last_access = match self.inspector.last_accessed(&event.path).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping event, device node not readable: {:?}", e);
                return false;
            }
        };

        let settled = is_settled(last_access, Utc::now(), self.config.minimum_age);
        if !settled {
            tracing::info!(
                "Device {} accessed at {}, less than {}s ago, skipping",
                event.path.display(),
                last_access,
                self.config.minimum_age.num_seconds()
            );
        }

        settled
    }

    async fn notify(&self, payload: &NotificationPayload) -> Outcome {
        match self.sink.deliver(payload).await {
            Ok(DeliveryResponse { status, .. }) if (200..300).contains(&status) => Outcome::Notified,
            Ok(DeliveryResponse { status, body }) => {
                Outcome::DeliveryFailed(format!("notify failed ({}): {}", status, body))
            }
            Err(e) => Outcome::DeliveryFailed(format!("notify failed: {:#}", e)),
        }
    }
}
