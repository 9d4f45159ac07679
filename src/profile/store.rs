//! akeyless CLI profiles.
//!
//! A profile lives in `<profiles_dir>/<name>.toml`. The CLI writes its
//! parameters under a table named after the profile:
//!
//! ```toml
//! ['default']
//! access_id = 'p-abc123'
//! access_type = 'access_key'
//! access_key = '...'
//! ```
//!
//! Files without that table are read from the top level.

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use crate::errors::{BrokerError, Result};
use crate::profile::parameters::{ParameterSet, IDENTITY_FIELD};

const PROFILE_EXTENSION: &str = "toml";

/// Resolves a profile name into its parameters.
pub trait ProfileStore {
    fn resolve(&self, name: &str) -> Result<ParameterSet>;
}

#[derive(Debug, Clone)]
pub struct TomlProfileStore {
    profiles_dir: PathBuf,
}

impl TomlProfileStore {
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self { profiles_dir: profiles_dir.into() }
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.{PROFILE_EXTENSION}"))
    }

    /// Names of every `*.toml` profile, sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.profiles_dir).map_err(|source| BrokerError::ProfileNotFound {
            name: "*".to_owned(),
            path: self.profiles_dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PROFILE_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_owned))
            .collect();
        names.sort();
        Ok(names)
    }
}

impl ProfileStore for TomlProfileStore {
    fn resolve(&self, name: &str) -> Result<ParameterSet> {
        check_profile_name(name)?;
        let path = self.profile_path(name);
        let content = fs::read_to_string(&path).map_err(|source| BrokerError::ProfileNotFound {
            name: name.to_owned(),
            path: path.clone(),
            source,
        })?;

        let params = parse_profile(name, &content)?;
        debug!(profile = name, path = %path.display(), parameters = params.len(), "profile resolved");
        Ok(params)
    }
}

/// A profile name must stay inside the profiles directory.
fn check_profile_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name.contains("..") {
        "name contains '..'"
    } else {
        return Ok(());
    };
    Err(BrokerError::InvalidProfile {
        name: name.to_owned(),
        reason: reason.to_owned(),
    })
}

/// Parse profile file content into a [`ParameterSet`].
pub fn parse_profile(name: &str, content: &str) -> Result<ParameterSet> {
    let invalid = |reason: String| BrokerError::InvalidProfile { name: name.to_owned(), reason };

    let mut root: Table = content.parse().map_err(|e: toml::de::Error| invalid(e.message().to_owned()))?;

    let table = match root.remove(name) {
        Some(Value::Table(section)) => section,
        Some(other) => {
            root.insert(name.to_owned(), other);
            root
        }
        None => root,
    };

    let mut params = ParameterSet::new();
    for (key, value) in table {
        let value = match value {
            Value::String(s) => s,
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Datetime(d) => d.to_string(),
            Value::Array(_) | Value::Table(_) => {
                return Err(invalid(format!("parameter '{key}' must be a scalar value")));
            }
        };
        params.insert(key, value);
    }

    if params.identity().is_none() {
        return Err(invalid(format!("missing '{IDENTITY_FIELD}'")));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_section_named_after_profile() {
        let params = parse_profile(
            "default",
            r#"
['default']
access_id = 'p-abc123'
access_type = 'access_key'
access_key = 'secret'
"#,
        )
        .unwrap();

        assert_eq!(params.identity(), Some("p-abc123"));
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["access_id", "access_key", "access_type"]);
    }

    #[test]
    fn falls_back_to_top_level() {
        let params = parse_profile("dev", "access_id = 'p-1'\nport = 8080\ndebug = true\n").unwrap();
        assert_eq!(params.get("port"), Some("8080"));
        assert_eq!(params.get("debug"), Some("true"));
    }

    #[test]
    fn rejects_nested_values_and_missing_identity() {
        let nested = parse_profile("dev", "access_id = 'p-1'\n[extra]\nx = 1\n").unwrap_err();
        assert!(matches!(nested, BrokerError::InvalidProfile { .. }));

        let missing = parse_profile("dev", "access_type = 'access_key'\n").unwrap_err();
        assert!(matches!(missing, BrokerError::InvalidProfile { ref reason, .. } if reason.contains("access_id")));

        let broken = parse_profile("dev", "access_id = \n").unwrap_err();
        assert!(matches!(broken, BrokerError::InvalidProfile { .. }));
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = TomlProfileStore::new(dir.path());
        assert!(matches!(store.resolve("ghost"), Err(BrokerError::ProfileNotFound { .. })));
    }

    #[test]
    fn names_escaping_profiles_dir_are_rejected() {
        let dir = TempDir::new().unwrap();
        let profiles = dir.path().join("profiles");
        fs::create_dir(&profiles).unwrap();
        fs::write(dir.path().join("outside.toml"), "access_id = 'p-out'").unwrap();
        let store = TomlProfileStore::new(&profiles);

        for name in ["../outside", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(store.resolve(name), Err(BrokerError::InvalidProfile { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn lists_only_toml_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prod.toml"), "access_id = 'a'").unwrap();
        fs::write(dir.path().join("default.toml"), "access_id = 'b'").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("old.toml")).unwrap();

        let store = TomlProfileStore::new(dir.path());
        assert_eq!(store.list_profiles().unwrap(), vec!["default", "prod"]);
    }
}
