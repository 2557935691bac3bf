use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// High score kept in a one-line plain-text file.
#[derive(Clone, Debug)]
pub(crate) struct HighScoreFile {
    path: PathBuf,
}

impl HighScoreFile {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable file counts as zero.
    pub(crate) fn load(&self) -> u32 {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }

    pub(crate) fn save(&self, score: u32) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{score}\n"))
            .with_context(|| format!("could not write {}", tmp.display()))?;
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("could not replace {}", self.path.display()))?;
        Ok(())
    }

    /// Writes are best effort: a failure is logged and otherwise ignored.
    pub(crate) fn save_quietly(&self, score: u32) {
        if let Err(e) = self.save(score) {
            log::warn!("high score not saved: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let hs = HighScoreFile::new(dir.path().join("nope.txt"));
        assert_eq!(hs.load(), 0);
    }

    #[test]
    fn test_garbage_reads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hs.txt");
        fs::write(&path, "not a number").unwrap();
        assert_eq!(HighScoreFile::new(&path).load(), 0);
    }

    #[test]
    fn test_save_then_relaunch_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hs.txt");
        HighScoreFile::new(&path).save(42).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "42");

        // a fresh handle stands in for a new process
        assert_eq!(HighScoreFile::new(&path).load(), 42);

        HighScoreFile::new(&path).save(43).unwrap();
        assert_eq!(HighScoreFile::new(&path).load(), 43);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_failure_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let hs = HighScoreFile::new(dir.path().join("missing-dir").join("hs.txt"));
        assert!(hs.save(5).is_err());
        hs.save_quietly(5);
        assert_eq!(hs.load(), 0);
    }
}
