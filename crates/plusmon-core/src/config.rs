// ── Connector configuration ──

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Inter-request pacing the devices require. The embedded HTTP stack
/// drops or garbles responses when dependent fetches arrive
/// back-to-back; this is a hardware constraint, not a tuning knob.
pub const DEFAULT_PACE_MS: u64 = 250;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn default_pace_ms() -> u64 {
    DEFAULT_PACE_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Configuration for one switch connector.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    /// Device address (IP or hostname, optionally `host:port`).
    pub host: String,
    /// Management password. Never logged.
    pub password: SecretString,
    /// Pacing delay between dependent fetches within one poll cycle,
    /// in milliseconds.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// When set, pages are read from this directory instead of the
    /// network (deterministic offline operation).
    #[serde(default)]
    pub offline_dir: Option<PathBuf>,
}

impl ConnectorConfig {
    pub fn new(host: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            password,
            pace_ms: DEFAULT_PACE_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            offline_dir: None,
        }
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_absent() {
        let config: ConnectorConfig = serde_json::from_str(
            r#"{"host": "192.168.0.239", "password": "Password1"}"#,
        )
        .expect("config parses");
        assert_eq!(config.host, "192.168.0.239");
        assert_eq!(config.pace(), Duration::from_millis(DEFAULT_PACE_MS));
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.offline_dir.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<ConnectorConfig, _> = serde_json::from_str(
            r#"{"host": "h", "password": "p", "passwrod": "typo"}"#,
        );
        assert!(result.is_err());
    }
}
