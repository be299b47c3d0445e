mod http;
mod monitoring;

pub use monitoring::{EnvFilterConfig, MonitoringConfig, MonitoringGuard, OtlpConfig};

pub use http::client::HttpClientConfig;

pub mod meter {
    pub use super::monitoring::meter::increment;
}
