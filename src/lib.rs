//! # Token Sheller Library
//!
//! Hands out akeyless access tokens for a named CLI profile, reusing a
//! cached token while it is still fresh and shelling out to the akeyless CLI
//! to mint a new one otherwise.
//!
//! Modules:
//! - `broker`: token lifecycle: cache lookup, then mint
//! - `cache`: token type, on-disk record format, cache scanning and writing
//! - `minting`: tool invocation building and execution
//! - `profile`: profile parameter sets and the TOML profile store
//! - `config`: settings file, overrides and validation

pub mod broker;
pub mod cache;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod minting;
pub mod observability;
pub mod profile;
pub mod utils;

#[cfg(test)]
mod tests;


pub use crate::broker::{get_token, TokenBroker};
pub use crate::cache::token::Token;
pub use crate::config::broker::{BrokerConfig, ConfigOverrides};
pub use crate::errors::{BrokerError, MintError};
