//! Atomic file writes for artifacts, key files and vaults.
//!
//! Every file is written to a sibling temp file and renamed over the target,
//! so a crash never leaves a half-written artifact or key behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` atomically (temp file, then rename).
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let temp = temp_path(path);
    fs::write(&temp, contents)?;
    fs::rename(&temp, path)?;
    Ok(())
}

/// Write `contents` atomically with owner-only permissions on Unix.
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let temp = temp_path(path);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&temp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp, path)?;
    Ok(())
}
