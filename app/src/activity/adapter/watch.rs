use std::path::Path;

use anyhow::Context as _;
use notify::event::{AccessKind, AccessMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::activity::{CaptureNodePattern, DeviceEvent, EventKind};

/// Recursive inotify watch on the device root. New subdirectories are picked up
/// automatically; dropping the value releases all watches.
pub struct DeviceWatch {
    _watcher: RecommendedWatcher,
    pattern: CaptureNodePattern,
}

impl DeviceWatch {
    pub fn start(pattern: CaptureNodePattern, tx: mpsc::Sender<DeviceEvent>) -> anyhow::Result<Self> {
        let root = pattern.root().to_path_buf();
        if !root.is_dir() {
            anyhow::bail!("Device root {} does not exist or is not a directory", root.display());
        }

        let filter = pattern.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for device_event in device_events(event, &filter) {
                    //Receiver gone means shutdown
                    if tx.blocking_send(device_event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::warn!("Error watching devices: {}", e),
        })
        .context("Error creating filesystem watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Error watching {}", root.display()))?;

        Ok(Self {
            _watcher: watcher,
            pattern,
        })
    }

    pub fn pattern(&self) -> &CaptureNodePattern {
        &self.pattern
    }
}

impl From<&notify::EventKind> for EventKind {
    fn from(kind: &notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Access(AccessKind::Open(_)) => EventKind::Opened,
            notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => EventKind::ClosedAfterWrite,
            _ => EventKind::Other,
        }
    }
}

fn device_events(event: notify::Event, pattern: &CaptureNodePattern) -> Vec<DeviceEvent> {
    let kind = EventKind::from(&event.kind);
    if kind == EventKind::Other {
        return vec![];
    }

    event
        .paths
        .into_iter()
        .filter(|path| is_candidate(path, pattern))
        .map(|path| DeviceEvent::new(path, kind))
        .collect()
}

fn is_candidate(path: &Path, pattern: &CaptureNodePattern) -> bool {
    let matches = pattern.matches(path);
    if !matches {
        tracing::trace!("Ignoring event for {}", path.display());
    }
    matches
}
