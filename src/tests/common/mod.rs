// src/tests/common/mod.rs
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::cache::record::encode;
use crate::cache::token::Token;
use crate::config::broker::{CACHE_DIR_NAME, PROFILES_DIR_NAME, TOOL_BINARY_NAME};

/// Throwaway `.akeyless` home with `profiles/`, `.tmp_creds/` and a `bin/`
/// directory for fake tools.
pub struct Home {
    dir: TempDir,
    bin: PathBuf,
}

impl Home {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join(PROFILES_DIR_NAME)).expect("profiles dir");
        fs::create_dir(dir.path().join(CACHE_DIR_NAME)).expect("cache dir");
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).expect("bin dir");
        Self { dir, bin }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join(CACHE_DIR_NAME)
    }
}

/// Write `<home>/profiles/<name>.toml` in the layout the akeyless CLI uses.
pub fn write_profile(home: &Path, name: &str, access_id: &str, extra: &[(&str, &str)]) -> PathBuf {
    let mut content = format!("['{name}']\naccess_id = '{access_id}'\n");
    for (key, value) in extra {
        content.push_str(&format!("{key} = '{value}'\n"));
    }
    let path = home.join(PROFILES_DIR_NAME).join(format!("{name}.toml"));
    fs::write(&path, content).expect("write profile");
    path
}

/// Install an executable `/bin/sh` script named like the real tool.
#[cfg(unix)]
pub fn write_tool_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(TOOL_BINARY_NAME);
    {
        let mut file = File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\n{body}").expect("write script");
        file.sync_all().expect("sync script");
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

pub fn write_record(cache_dir: &Path, file_name: &str, access_id: &str, value: &str, expiry: DateTime<Utc>) -> PathBuf {
    let token = Token::new(access_id.to_owned(), value.to_owned(), expiry);
    let path = cache_dir.join(file_name);
    fs::write(&path, encode(&token).expect("encode")).expect("write record");
    path
}
