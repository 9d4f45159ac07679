//! Configuration validation with aggregated errors.
//!
//! Every issue is collected before failing so a misconfigured host is fixed
//! in one pass.

use std::path::Path;

use tracing::{error, info};

use crate::config::broker::{BrokerConfig, PROFILES_DIR_NAME};
use crate::errors::{BrokerError, Result};
use crate::minting::invocation::{resolve_executable, validate_executable};
use crate::profile::TomlProfileStore;

/// Returns `Ok(())` or `InvalidConfig` listing every issue found.
pub fn validate_broker_config(cfg: &BrokerConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if let Err(e) = validate_executable(&resolve_executable(&cfg.cli_path)) {
        errors.push(e.to_string());
    }

    validate_home(&cfg.home_path, &mut errors);

    let store = TomlProfileStore::new(cfg.profiles_dir());
    let profile_path = store.profile_path(&cfg.profile);
    if !profile_path.is_file() {
        errors.push(format!(
            "profile '{}': file {} does not exist or is not readable",
            cfg.profile,
            profile_path.display()
        ));
    }

    if cfg.mint_timeout.is_zero() {
        errors.push("mint_timeout must be greater than zero".to_owned());
    }
    if cfg.expiry_buffer >= cfg.mint_validity {
        errors.push(format!(
            "expiry_buffer ({:?}) must be shorter than mint_validity ({:?}), otherwise no token is ever reusable",
            cfg.expiry_buffer, cfg.mint_validity
        ));
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(BrokerError::InvalidConfig(errors))
    }
}

fn validate_home(home: &Path, errors: &mut Vec<String>) {
    if !home.is_dir() {
        errors.push(format!("home_path {} is not a directory", home.display()));
        return;
    }
    let profiles = home.join(PROFILES_DIR_NAME);
    if !profiles.is_dir() {
        errors.push(format!(
            "home_path {} has no '{}' subdirectory; it is likely not an akeyless home directory",
            home.display(),
            PROFILES_DIR_NAME
        ));
    }
}
