use std::path::PathBuf;
use std::time::Duration;

pub use visitlog_core::config::ConfigError;
use visitlog_core::config::{non_blank_var, parse_var};

use crate::scanner::ScannerConfig;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against the
/// reference backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL (default: `http://localhost:5000`).
    pub backend_url: String,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Identity reported with every visit.
    pub student_id: Option<String>,
    /// Admin bearer credential supplied directly; takes precedence over the
    /// credential file.
    pub bearer_token: Option<String>,
    /// Where the admin bearer credential is persisted.
    pub credential_file: PathBuf,
    /// Scan-loop tuning.
    pub scanner: ScannerConfig,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                   |
    /// |--------------------------|---------------------------|
    /// | `BACKEND_URL`            | `http://localhost:5000`   |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                      |
    /// | `STUDENT_ID`             | unset                     |
    /// | `BEARER_TOKEN`           | unset                     |
    /// | `CREDENTIAL_FILE`        | `.visitlog/credential`    |
    /// | `SCAN_POLL_INTERVAL_MS`  | `300`                     |
    /// | `SCAN_CHANNEL_CAPACITY`  | `16`                      |
    /// | `SCAN_SETTLE_DELAY_MS`   | `1500`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url =
            std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:5000".into());

        let request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", "30", "u64")?;

        let student_id = non_blank_var("STUDENT_ID");
        let bearer_token = non_blank_var("BEARER_TOKEN");

        let credential_file = std::env::var("CREDENTIAL_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".visitlog/credential"));

        let poll_interval_ms: u64 = parse_var("SCAN_POLL_INTERVAL_MS", "300", "u64")?;
        let channel_capacity: usize = parse_var("SCAN_CHANNEL_CAPACITY", "16", "usize")?;
        let settle_delay_ms: u64 = parse_var("SCAN_SETTLE_DELAY_MS", "1500", "u64")?;

        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "SCAN_POLL_INTERVAL_MS",
                expected: "positive integer",
                value: "0".into(),
            });
        }
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SCAN_CHANNEL_CAPACITY",
                expected: "positive integer",
                value: "0".into(),
            });
        }

        Ok(Self {
            backend_url,
            request_timeout_secs,
            student_id,
            bearer_token,
            credential_file,
            scanner: ScannerConfig {
                poll_interval: Duration::from_millis(poll_interval_ms),
                channel_capacity,
                settle_delay: Duration::from_millis(settle_delay_ms),
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
