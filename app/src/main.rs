use anyhow::Context as _;
use clap::Parser;
use settings::{Args, Settings};
use tokio::sync::mpsc;

use crate::activity::adapter::{DeviceWatch, FsNodeInspector, IwconfigProbe, WebhookSink};
use crate::activity::{CaptureNodePattern, MicActivityRunner, TransitionFilter};

mod activity;
mod settings;

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> anyhow::Result<()> {
    let settings = Settings::new(Args::parse()).context("Error reading configuration")?;

    let _monitoring = settings
        .monitoring
        .init()
        .map_err(|e| anyhow::anyhow!("Error initializing monitoring: {}", e))?;

    let config = settings.filter_config()?;

    let (event_tx, event_rx) = mpsc::channel(64);

    let watch = DeviceWatch::start(CaptureNodePattern::new(config.device_root.clone()), event_tx)
        .context("Error setting up device watch")?;

    let sink = WebhookSink::new(
        &config.webhook_url,
        settings.webhook.token.clone(),
        settings.webhook.timeout(),
    )
    .context("Error initializing webhook client")?;
    let probe = IwconfigProbe::new(&settings.mic.iwconfig, settings.mic.iwconfig_timeout());

    if let Some(ssid) = &config.required_network {
        tracing::info!("Reporting only while connected to {}", ssid);
    }
    tracing::info!("Watching all items matching {}", watch.pattern());

    let runner = MicActivityRunner::new(TransitionFilter::new(config, probe, FsNodeInspector, sink), event_rx);

    tokio::select!(
        _ = runner.run() => {},
        res = shutdown_signal() => {
            res?;
            tracing::info!("Shutting down");
        },
    );

    drop(watch);

    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Error installing SIGTERM handler")?;

    tokio::select!(
        res = tokio::signal::ctrl_c() => res.context("Error waiting for Ctrl-C")?,
        _ = terminate.recv() => {},
    );

    Ok(())
}
