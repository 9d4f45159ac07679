use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::config::settings::BrokerSettings;
use crate::errors::{BrokerError, Result};

/// Name of the external authentication tool.
pub const TOOL_BINARY_NAME: &str = "akeyless";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_HOME_DIR_NAME: &str = ".akeyless";
pub const PROFILES_DIR_NAME: &str = "profiles";
pub const CACHE_DIR_NAME: &str = ".tmp_creds";

pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MINT_TIMEOUT: Duration = Duration::from_secs(60);
/// The tool's output carries no expiry; a minted token is trusted this long.
pub const DEFAULT_MINT_VALIDITY: Duration = Duration::from_secs(60 * 60);

/// Values that beat the settings file (CLI flags and their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cli_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub home_path: Option<PathBuf>,
    pub expiry_buffer: Option<Duration>,
}

/// Fully resolved broker configuration. Built once at startup and passed by
/// reference; nothing downstream looks at the environment.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// akeyless binary, or a directory containing it
    pub cli_path: PathBuf,
    pub profile: String,
    pub home_path: PathBuf,
    pub expiry_buffer: Duration,
    pub mint_timeout: Duration,
    pub mint_validity: Duration,
    pub persist_minted: bool,
}

impl BrokerConfig {
    pub fn new(cli_path: impl Into<PathBuf>, profile: impl Into<String>, home_path: impl Into<PathBuf>) -> Self {
        Self {
            cli_path: cli_path.into(),
            profile: profile.into(),
            home_path: home_path.into(),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            mint_timeout: DEFAULT_MINT_TIMEOUT,
            mint_validity: DEFAULT_MINT_VALIDITY,
            persist_minted: false,
        }
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.home_path.join(PROFILES_DIR_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home_path.join(CACHE_DIR_NAME)
    }

    /// Merge overrides, settings and defaults, in that order of precedence.
    pub fn resolve(settings: &BrokerSettings, overrides: &ConfigOverrides) -> Result<Self> {
        let mut issues = Vec::new();

        let cli_path = overrides
            .cli_path
            .clone()
            .or_else(|| settings.cli_path.clone())
            .or_else(|| which::which(TOOL_BINARY_NAME).ok());
        if cli_path.is_none() {
            issues.push(format!("cli_path is not set and '{TOOL_BINARY_NAME}' is not in the system PATH"));
        }

        let home_path = overrides
            .home_path
            .clone()
            .or_else(|| settings.home_path.clone())
            .or_else(|| dirs::home_dir().map(|home| home.join(DEFAULT_HOME_DIR_NAME)));
        if home_path.is_none() {
            issues.push("home_path is not set and the user home directory is unknown".to_owned());
        }

        let (Some(cli_path), Some(home_path)) = (cli_path, home_path) else {
            return Err(BrokerError::InvalidConfig(issues));
        };

        let profile = overrides
            .profile
            .clone()
            .or_else(|| settings.profile.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_owned());

        let config = Self {
            cli_path,
            profile,
            home_path,
            expiry_buffer: overrides
                .expiry_buffer
                .or(settings.expiry_buffer)
                .filter(|b| !b.is_zero())
                .unwrap_or(DEFAULT_EXPIRY_BUFFER),
            mint_timeout: settings.mint_timeout.unwrap_or(DEFAULT_MINT_TIMEOUT),
            mint_validity: settings.mint_validity.unwrap_or(DEFAULT_MINT_VALIDITY),
            persist_minted: settings.persist_minted.unwrap_or(false),
        };
        debug!(?config, "broker configuration resolved");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_beat_settings_beat_defaults() {
        let settings = BrokerSettings {
            cli_path: Some("/opt/akeyless".into()),
            profile: Some("from-file".into()),
            home_path: Some("/srv/akeyless".into()),
            expiry_buffer: Some(Duration::from_secs(120)),
            mint_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            profile: Some("from-flag".into()),
            ..Default::default()
        };

        let config = BrokerConfig::resolve(&settings, &overrides).unwrap();
        assert_eq!(config.cli_path, PathBuf::from("/opt/akeyless"));
        assert_eq!(config.profile, "from-flag");
        assert_eq!(config.expiry_buffer, Duration::from_secs(120));
        assert_eq!(config.mint_timeout, Duration::from_secs(5));
        assert_eq!(config.mint_validity, DEFAULT_MINT_VALIDITY);
        assert!(!config.persist_minted);
        assert_eq!(config.cache_dir(), PathBuf::from("/srv/akeyless/.tmp_creds"));
        assert_eq!(config.profiles_dir(), PathBuf::from("/srv/akeyless/profiles"));
    }

    #[test]
    fn zero_buffer_and_empty_profile_fall_back_to_defaults() {
        let overrides = ConfigOverrides {
            cli_path: Some("/opt/akeyless".into()),
            home_path: Some("/srv/akeyless".into()),
            profile: Some(String::new()),
            expiry_buffer: Some(Duration::ZERO),
        };

        let config = BrokerConfig::resolve(&BrokerSettings::default(), &overrides).unwrap();
        assert_eq!(config.profile, DEFAULT_PROFILE);
        assert_eq!(config.expiry_buffer, DEFAULT_EXPIRY_BUFFER);
    }
}
