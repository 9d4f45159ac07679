use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::BrokerSettings;
use crate::errors::{BrokerError, Result};

/// Load settings from a YAML file, expanding `${VAR}` / `${VAR:default}`
/// placeholders from the process environment first.
pub fn file_to_settings(path: &Path) -> Result<BrokerSettings> {
    let content = fs::read_to_string(path).map_err(|e| BrokerError::Settings {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let expanded = expand_env_vars(&content, |var| std::env::var(var).ok());
    parse_settings(&expanded).map_err(|reason| {
        error!(path = %path.display(), %reason, "parse settings error");
        BrokerError::Settings { path: path.to_path_buf(), reason }
    })
}

pub fn parse_settings(content: &str) -> std::result::Result<BrokerSettings, String> {
    // an empty document is a valid "use the defaults" file
    if content.trim().is_empty() {
        return Ok(BrokerSettings::default());
    }
    let settings: BrokerSettings = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    debug!(?settings, "settings parsed");
    Ok(settings)
}

pub fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("valid placeholder pattern"));

    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        lookup(var).unwrap_or_else(|| default.to_string())
    })
    .to_string()
}
