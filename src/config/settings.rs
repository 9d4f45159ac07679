use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// ================================
/// Settings file (all optional)
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct BrokerSettings {
    /// akeyless binary, or a directory containing it
    pub cli_path: Option<PathBuf>,
    pub profile: Option<String>,
    /// the `.akeyless` home directory
    pub home_path: Option<PathBuf>,
    #[serde(default, deserialize_with = "humantime_option::deserialize")]
    pub expiry_buffer: Option<Duration>,
    #[serde(default, deserialize_with = "humantime_option::deserialize")]
    pub mint_timeout: Option<Duration>,
    /// how long a freshly minted token is trusted
    #[serde(default, deserialize_with = "humantime_option::deserialize")]
    pub mint_validity: Option<Duration>,
    pub persist_minted: Option<bool>,
    pub logging: Option<LoggingConfig>,
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    pub textfile_path: Option<PathBuf>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

mod humantime_option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
