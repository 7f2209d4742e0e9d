//! Durability helpers for state files.
//!
//! A rename is only crash-safe once the containing directory entry has
//! been synced: without the directory fsync a renamed state file can
//! revert to its old name after power loss even though its contents were
//! synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk (`fsync(2)`).
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so renames and creations within it are durable.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

/// Writes `bytes` to `path` atomically: temp file, fsync, rename, fsync
/// the parent directory. Readers see either the old or the new contents,
/// never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_the_file_and_no_temp_residue() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        write_atomic(&path, b"{\"a\":1}").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn write_atomic_replaces_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");

        write_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn fsync_dir_fails_on_missing_path() {
        assert!(fsync_dir(Path::new("/definitely/not/a/real/dir")).is_err());
    }
}
