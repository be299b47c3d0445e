use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use derive_more::derive::{Display, Error};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::activity::FilterConfig;

/// Report microphone usage to Home Assistant
#[derive(Debug, Default, Parser)]
#[command(version, about)]
pub struct Args {
    /// Home Assistant webhook URL
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Bearer token sent with every webhook request
    #[arg(long, env = "WEBHOOK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Home Assistant entity-id, e.g. input_boolean.some_name
    #[arg(long, env = "ENTITY_ID")]
    pub entity_id: Option<String>,

    /// Only send reports, if connected to this ssid
    #[arg(long, env = "SSID")]
    pub ssid: Option<String>,

    /// Ignore devices accessed less than this many seconds ago
    #[arg(long, env = "MIN_AGE")]
    pub min_age: Option<u64>,

    /// Directory containing the sound device nodes
    #[arg(long, env = "DEVICE_ROOT")]
    pub device_root: Option<PathBuf>,

    /// Configuration file, optional
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    pub webhook: WebhookSettings,
    pub mic: MicSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MicSettings {
    pub entity_id: String,
    pub ssid: Option<String>,
    #[serde(default = "default_min_age")]
    pub min_age: u64,
    #[serde(default = "default_device_root")]
    pub device_root: PathBuf,
    #[serde(default = "default_iwconfig")]
    pub iwconfig: String,
    #[serde(default = "default_timeout_secs")]
    pub iwconfig_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_age() -> u64 {
    5
}

fn default_device_root() -> PathBuf {
    PathBuf::from("/dev/snd")
}

fn default_iwconfig() -> String {
    "iwconfig".to_string()
}

#[derive(Debug, Display, Error)]
#[display("Invalid minimum age {seconds}s, out of range")]
pub struct InvalidMinAge {
    pub seconds: u64,
}

impl Settings {
    //Precedence: command line / plain env vars > MICWATCH__* env vars > config file
    pub fn new(args: Args) -> Result<Self, ConfigError> {
        Self::load(args, Environment::with_prefix("MICWATCH").separator("__"))
    }

    fn load(args: Args, environment: Environment) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(args.config.clone()).required(false))
            .add_source(environment)
            .set_override_option("webhook.url", args.webhook_url)?
            .set_override_option("webhook.token", args.token)?
            .set_override_option("mic.entity_id", args.entity_id)?
            .set_override_option("mic.ssid", args.ssid)?
            .set_override_option("mic.min_age", args.min_age)?
            .set_override_option(
                "mic.device_root",
                args.device_root.map(|p| p.to_string_lossy().to_string()),
            )?;

        builder.build()?.try_deserialize()
    }

    pub fn filter_config(&self) -> anyhow::Result<FilterConfig> {
        let minimum_age = i64::try_from(self.mic.min_age)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or(InvalidMinAge {
                seconds: self.mic.min_age,
            })?;

        Ok(FilterConfig {
            webhook_url: self.webhook.url.clone(),
            entity_id: self.mic.entity_id.parse()?,
            required_network: self.mic.ssid.clone().filter(|s| !s.is_empty()),
            minimum_age,
            device_root: self.mic.device_root.clone(),
        })
    }
}

impl WebhookSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MicSettings {
    pub fn iwconfig_timeout(&self) -> Duration {
        Duration::from_secs(self.iwconfig_timeout_secs)
    }
}
