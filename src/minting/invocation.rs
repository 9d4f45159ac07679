use std::fs;
use std::path::{Path, PathBuf};

use crate::config::broker::TOOL_BINARY_NAME;
use crate::errors::{BrokerError, Result};
use crate::profile::ParameterSet;

pub const AUTH_SUBCOMMAND: &str = "auth";
/// Ask the tool for the bare token value instead of its JSON envelope.
pub const OUTPUT_FLAGS: [&str; 3] = ["--json", "--jq-expression", ".token"];

/// Program plus argument list for one mint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl InvocationSpec {
    /// Flags only, values left out. Profile values include secrets.
    pub fn redacted(&self) -> String {
        self.args
            .iter()
            .filter(|a| a.starts_with("--") || a.as_str() == AUTH_SUBCOMMAND)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A directory is taken to contain the tool; anything else is the tool itself.
pub fn resolve_executable(cli_path: &Path) -> PathBuf {
    if cli_path.is_dir() {
        cli_path.join(TOOL_BINARY_NAME)
    } else {
        cli_path.to_path_buf()
    }
}

pub fn parameter_flag(key: &str) -> String {
    format!("--{}", key.replace('_', "-"))
}

/// `<tool> auth --<key> <value> ... --json --jq-expression .token`, with
/// parameters in key order.
pub fn build_invocation(cli_path: &Path, params: &ParameterSet) -> InvocationSpec {
    let mut args = Vec::with_capacity(1 + params.len() * 2 + OUTPUT_FLAGS.len());
    args.push(AUTH_SUBCOMMAND.to_owned());
    for (key, value) in params.iter() {
        args.push(parameter_flag(key));
        args.push(value.to_owned());
    }
    args.extend(OUTPUT_FLAGS.iter().map(|f| f.to_string()));

    InvocationSpec {
        program: resolve_executable(cli_path),
        args,
    }
}

/// The program must be an existing regular file with an execute bit.
pub fn validate_executable(path: &Path) -> Result<()> {
    let invalid = |reason: &str| BrokerError::InvalidExecutable {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    };

    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => invalid("does not exist"),
        std::io::ErrorKind::PermissionDenied => invalid("is not accessible"),
        _ => invalid(&e.to_string()),
    })?;

    if !metadata.is_file() {
        return Err(invalid("is not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(invalid("is not executable"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn arguments_are_sorted_by_key() {
        let params: ParameterSet = vec![("region", "us"), ("method", "api_key")].into_iter().collect();
        let reversed: ParameterSet = vec![("method", "api_key"), ("region", "us")].into_iter().collect();

        let spec = build_invocation(Path::new("/opt/bin/akeyless"), &params);
        assert_eq!(
            spec.args,
            vec!["auth", "--method", "api_key", "--region", "us", "--json", "--jq-expression", ".token"]
        );
        assert_eq!(spec, build_invocation(Path::new("/opt/bin/akeyless"), &reversed));
    }

    #[test]
    fn underscores_become_hyphens_and_values_stay_whole() {
        let params: ParameterSet = vec![("access_id", "p-1"), ("access_key", "has spaces in it")]
            .into_iter()
            .collect();

        let spec = build_invocation(Path::new("/opt/bin/akeyless"), &params);
        assert_eq!(&spec.args[1..5], ["--access-id", "p-1", "--access-key", "has spaces in it"]);
        assert_eq!(spec.redacted(), "auth --access-id --access-key --json --jq-expression");
    }

    #[test]
    fn directory_cli_path_is_joined_with_tool_name() {
        let dir = TempDir::new().unwrap();
        let spec = build_invocation(dir.path(), &ParameterSet::new());
        assert_eq!(spec.program, dir.path().join("akeyless"));
    }

    #[test]
    fn rejects_missing_and_directory_programs() {
        let dir = TempDir::new().unwrap();

        let missing = validate_executable(&dir.path().join("akeyless")).unwrap_err();
        assert!(matches!(missing, BrokerError::InvalidExecutable { ref reason, .. } if reason == "does not exist"));

        let directory = validate_executable(dir.path()).unwrap_err();
        assert!(matches!(directory, BrokerError::InvalidExecutable { ref reason, .. } if reason == "is not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_files_without_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("akeyless");
        fs::write(&path, "#!/bin/sh\necho tok\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let err = validate_executable(&path).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidExecutable { ref reason, .. } if reason == "is not executable"));

        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        validate_executable(&path).unwrap();
    }
}
