use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context as _;
use regex::Regex;
use tokio::process::Command;

use super::NetworkProbe;

static ESSID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"ESSID:"([^"]*)""#).expect("valid ESSID regex"));

/// Reads the current wireless association from the output of `iwconfig`.
pub struct IwconfigProbe {
    program: String,
    timeout: Duration,
}

impl IwconfigProbe {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_owned(),
            timeout,
        }
    }
}

impl NetworkProbe for IwconfigProbe {
    #[tracing::instrument(name = "query wireless association", skip(self), fields(program = %self.program))]
    async fn associated_networks(&self) -> anyhow::Result<Vec<String>> {
        let output = Command::new(&self.program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .with_context(|| format!("{} did not finish within {:?}", self.program, self.timeout))?
            .with_context(|| format!("Error running {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!("{} failed with {}", self.program, output.status);
        }

        Ok(parse_essids(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_essids(output: &str) -> Vec<String> {
    ESSID
        .captures_iter(output)
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IWCONFIG_OUTPUT: &str = r#"lo        no wireless extensions.

wlp2s0    IEEE 802.11  ESSID:"HomeNet"
          Mode:Managed  Frequency:5.18 GHz  Access Point: 12:34:56:78:9A:BC
          Bit Rate=866.7 Mb/s   Tx-Power=22 dBm

enp0s31f6  no wireless extensions.
"#;

    #[test]
    fn parses_associated_network() {
        assert_eq!(parse_essids(IWCONFIG_OUTPUT), vec!["HomeNet".to_string()]);
    }

    #[test]
    fn unassociated_interface_yields_nothing() {
        let output = "wlan0     IEEE 802.11  ESSID:off/any\n          Mode:Managed  Access Point: Not-Associated";

        assert!(parse_essids(output).is_empty());
    }

    #[test]
    fn multiple_interfaces() {
        let output = "wlan0  ESSID:\"HomeNet\"\nwlan1  ESSID:\"Guest Net\"\n";

        assert_eq!(parse_essids(output), vec!["HomeNet".to_string(), "Guest Net".to_string()]);
    }

    #[tokio::test]
    async fn missing_program_fails() {
        let probe = IwconfigProbe::new("/nonexistent/iwconfig", Duration::from_secs(1));

        assert!(probe.associated_networks().await.is_err());
    }

    #[tokio::test]
    async fn failing_program_fails() {
        let probe = IwconfigProbe::new("false", Duration::from_secs(5));

        assert!(probe.associated_networks().await.is_err());
    }
}
