pub mod adapter;
mod domain;
mod service;

pub use domain::*;
pub use service::{Outcome, TransitionFilter};

use tokio::sync::mpsc;

use adapter::{NetworkProbe, NodeInspector, NotificationSink};

/// Single consumer of device events. Every event is handled to completion before
/// the next one is taken, so on/off notifications keep the order of the device events.
pub struct MicActivityRunner<N, I, S> {
    filter: TransitionFilter<N, I, S>,
    events: mpsc::Receiver<DeviceEvent>,
}

impl<N, I, S> MicActivityRunner<N, I, S>
where
    N: NetworkProbe,
    I: NodeInspector,
    S: NotificationSink,
{
    pub fn new(filter: TransitionFilter<N, I, S>, events: mpsc::Receiver<DeviceEvent>) -> Self {
        Self { filter, events }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            let path = event.path.clone();
            let kind = event.kind;

            match self.filter.handle(event).await {
                Outcome::Discarded => {}
                outcome => tracing::debug!("{} for {}: {}", kind, path.display(), outcome),
            }
        }

        tracing::info!("Device event stream closed");
    }
}
