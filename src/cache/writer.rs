use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cache::record;
use crate::cache::token::Token;
use crate::errors::{BrokerError, Result};

const RECORD_PREFIX: &str = "sheller-";

/// File name used for a token minted by this broker.
///
/// ASCII alphanumerics are kept, every other byte becomes `_xx` (lowercase
/// hex). `_` is itself escaped, so distinct identities never share a name.
pub fn record_file_name(access_id: &str) -> String {
    let mut name = String::from(RECORD_PREFIX);
    for byte in access_id.bytes() {
        if byte.is_ascii_alphanumeric() {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02x}"));
        }
    }
    name
}

/// Write `token` into `cache_dir`, replacing any earlier record for the same
/// identity. Write goes to a `.tmp` sibling first and is renamed into place.
pub fn persist_token(cache_dir: &Path, token: &Token) -> Result<PathBuf> {
    let path = cache_dir.join(record_file_name(&token.access_id));
    let tmp = path.with_extension("tmp");

    let bytes = record::encode(token).map_err(|e| BrokerError::Persist {
        path: path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let to_persist_err = |source| BrokerError::Persist { path: path.clone(), source };

    fs::create_dir_all(cache_dir).map_err(to_persist_err)?;
    fs::write(&tmp, bytes).map_err(to_persist_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(to_persist_err)?;
    }
    fs::rename(&tmp, &path).map_err(to_persist_err)?;

    info!(path = %path.display(), access_id = %token.access_id, "persisted minted token");
    Ok(path)
}
