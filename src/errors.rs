//! Broker error types.

use std::path::PathBuf;
use std::time::Duration;

/// Errors surfaced to callers of the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("profile '{name}' not found at {}: {source}", path.display())]
    ProfileNotFound {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile '{name}' is invalid: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("token cache {} is unreadable: {source}", path.display())]
    CacheUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid executable {}: {reason}", path.display())]
    InvalidExecutable { path: PathBuf, reason: String },

    #[error("minting a token for profile '{profile}' failed: {source}")]
    MintFailed {
        profile: String,
        #[source]
        source: MintError,
    },

    #[error("failed to persist token record {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not valid, total errors: {}\n{}", .0.len(), .0.join("\n"))]
    InvalidConfig(Vec<String>),

    #[error("settings file {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },
}

/// Underlying cause of a failed mint.
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o while waiting for the child process: {0}")]
    Io(#[from] std::io::Error),

    #[error("process exited with {}: {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_owned()))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("process did not finish within {0:?}")]
    Timeout(Duration),

    #[error("process produced no token on stdout")]
    EmptyOutput,
}

impl MintError {
    /// Short label used for the failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            MintError::Spawn { .. } => "spawn",
            MintError::Io(_) => "io",
            MintError::ExitStatus { .. } => "exit_status",
            MintError::Timeout(_) => "timeout",
            MintError::EmptyOutput => "empty_output",
        }
    }
}

/// Token record decode/encode failures. Never surfaced by the broker itself.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed token record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("token record field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("token record expiry {0} is out of range")]
    ExpiryOutOfRange(i64),
}

pub type Result<T, E = BrokerError> = std::result::Result<T, E>;
