//! Crash-safe file replacement.
//!
//! Writers go to `<dest>.part`, get fsynced, and are renamed over `dest`. A crash mid-write
//! leaves the previous file intact; on error the partial file is removed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Path of the temporary sibling used while `dest` is being written.
pub fn part_path(dest: &Path) -> PathBuf {
    PathBuf::from(format!("{}.part", dest.display()))
}

/// Write `dest` atomically using `fill` to produce the contents.
pub fn write_atomically<F>(dest: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let tmp_path = part_path(dest);

    let result = (|| -> Result<()> {
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

        fill(&mut file)?;

        file.sync_all()?;
        fs::rename(&tmp_path, dest)
            .with_context(|| format!("failed to move into place: {}", dest.display()))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

/// Convenience wrapper for writing an in-memory buffer atomically.
pub fn write_bytes_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    write_atomically(dest, |file| {
        file.write_all(bytes)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_renames() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("nested").join("out.json");

        write_bytes_atomically(&dest, b"[]")?;

        assert_eq!(fs::read(&dest)?, b"[]");
        assert!(!part_path(&dest).exists());
        Ok(())
    }

    #[test]
    fn failure_keeps_previous_contents_and_removes_part_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("out.json");
        fs::write(&dest, b"old")?;

        let err = write_atomically(&dest, |file| {
            use std::io::Write;
            file.write_all(b"half")?;
            anyhow::bail!("simulated failure")
        })
        .unwrap_err();

        assert!(err.to_string().contains("simulated failure"));
        assert_eq!(fs::read(&dest)?, b"old");
        assert!(!part_path(&dest).exists());
        Ok(())
    }
}
