//! Size-based file rotation.
//!
//! Backups are numbered `app.log.1` (newest) to `app.log.N` (oldest).
//! Rolling over shifts every backup up by one, drops the one that would
//! exceed the retention count and moves the live file to `.1`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Rotation policy for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl RotationPolicy {
    /// True if writing `incoming` more bytes onto a file of `current` bytes
    /// must first roll the file over. Without backups the file never rolls,
    /// and an empty file is never rolled into an empty backup.
    pub fn should_rollover(&self, current: u64, incoming: u64) -> bool {
        self.max_bytes > 0
            && self.backup_count > 0
            && current > 0
            && current + incoming >= self.max_bytes
    }
}

/// Path of backup number `n` for `path`.
pub fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", n));
    PathBuf::from(name)
}

/// Shift backups of `path` and move the live file to `path.1`.
///
/// The live file must be closed by the caller.
pub fn rollover(path: &Path, backup_count: u32) -> io::Result<()> {
    if backup_count == 0 {
        return Ok(());
    }

    for i in (1..backup_count).rev() {
        let src = backup_path(path, i);
        let dst = backup_path(path, i + 1);
        if src.exists() {
            if dst.exists() {
                fs::remove_file(&dst)?;
            }
            fs::rename(&src, &dst)?;
        }
    }

    let first = backup_path(path, 1);
    if first.exists() {
        fs::remove_file(&first)?;
    }
    if path.exists() {
        fs::rename(path, &first)?;
    }
    Ok(())
}
