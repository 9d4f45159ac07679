use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::cache::record;
use crate::cache::token::Token;
use crate::errors::{BrokerError, Result};
use crate::observability::metrics::get_metrics;

/// Token records carry no extension. Any name with a dot is somebody else's
/// file (including dotfiles and in-flight `*.tmp` writes).
pub fn is_token_record_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.')
}

/// Find a cached token owned by `access_id` that is still valid at
/// `now + buffer`.
///
/// Returns `Ok(None)` when the scan completed without a match. Unreadable or
/// malformed records are skipped. Failing to list `cache_dir` itself is an
/// error.
pub fn find_valid_token(
    cache_dir: &Path,
    access_id: &str,
    now: DateTime<Utc>,
    buffer: Duration,
) -> Result<Option<Token>> {
    let entries = fs::read_dir(cache_dir).map_err(|source| BrokerError::CacheUnreadable {
        path: cache_dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(path = %cache_dir.display(), error = %err, "skipping unreadable cache entry");
                continue;
            }
        };

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !is_token_record_name(name) {
            continue;
        }

        let path = entry.path();
        // follows symlinks
        if fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(true) {
            continue;
        }

        let token = match fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| record::decode(&bytes).map_err(|e| e.to_string()))
        {
            Ok(t) => t,
            Err(reason) => {
                warn!(path = %path.display(), %reason, "skipping corrupt token record");
                get_metrics().corrupt_records.inc();
                continue;
            }
        };

        if !token.is_owned_by(access_id) {
            continue;
        }
        if !token.is_valid_at(now, buffer) {
            debug!(path = %path.display(), expiry = %token.expiry, "cached token too close to expiry");
            continue;
        }

        debug!(path = %path.display(), access_id, "found valid cached token");
        return Ok(Some(token));
    }

    Ok(None)
}
