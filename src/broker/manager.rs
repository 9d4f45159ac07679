use tracing::{debug, info, warn};

use crate::cache::scanner::find_valid_token;
use crate::cache::token::Token;
use crate::cache::writer::persist_token;
use crate::config::broker::BrokerConfig;
use crate::errors::{BrokerError, Result};
use crate::helpers::time::{now, to_chrono};
use crate::minting::mint;
use crate::observability::metrics::{get_metrics, LOOKUP_HIT, LOOKUP_MISS, LOOKUP_UNREADABLE};
use crate::profile::{ProfileStore, TomlProfileStore, IDENTITY_FIELD};

/// Hands out tokens: cached when one is still fresh, minted otherwise.
///
/// Holds nothing between calls but the profile store. Two concurrent calls
/// for the same profile may both mint.
#[derive(Debug, Clone)]
pub struct TokenBroker<S> {
    store: S,
}

impl TokenBroker<TomlProfileStore> {
    /// Broker reading profiles from `<home>/profiles`.
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self::new(TomlProfileStore::new(config.profiles_dir()))
    }
}

impl<S: ProfileStore> TokenBroker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return a token for `profile_name` that stays valid past
    /// `config.expiry_buffer`.
    ///
    /// An unreadable cache directory counts as a miss. Profile and mint
    /// failures are returned as is; nothing is retried.
    pub fn get_token(&self, profile_name: &str, config: &BrokerConfig) -> Result<Token> {
        let params = self.store.resolve(profile_name)?;
        let access_id = params.identity().ok_or_else(|| BrokerError::InvalidProfile {
            name: profile_name.to_owned(),
            reason: format!("missing '{IDENTITY_FIELD}'"),
        })?;

        let metrics = get_metrics();
        let cache_dir = config.cache_dir();
        match find_valid_token(&cache_dir, access_id, now(), to_chrono(config.expiry_buffer)) {
            Ok(Some(token)) => {
                metrics.cache_lookups.with_label_values(&[LOOKUP_HIT]).inc();
                info!(profile = profile_name, access_id, expiry = %token.expiry, "using cached token");
                return Ok(token);
            }
            Ok(None) => {
                metrics.cache_lookups.with_label_values(&[LOOKUP_MISS]).inc();
                debug!(profile = profile_name, access_id, "no valid cached token");
            }
            Err(err) => {
                metrics.cache_lookups.with_label_values(&[LOOKUP_UNREADABLE]).inc();
                warn!(profile = profile_name, error = %err, "token cache unreadable, minting instead");
            }
        }

        let token = mint(profile_name, &params, config)?;

        if config.persist_minted {
            if let Err(err) = persist_token(&cache_dir, &token) {
                warn!(profile = profile_name, error = %err, "could not persist minted token");
            }
        }
        Ok(token)
    }
}

/// Resolve `profile_name` from the TOML profiles under `config.home_path`
/// and return a usable token.
pub fn get_token(profile_name: &str, config: &BrokerConfig) -> Result<Token> {
    TokenBroker::from_config(config).get_token(profile_name, config)
}
