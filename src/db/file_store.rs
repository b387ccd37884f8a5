//! Whole-file line storage. Every collection rewrite goes through a temp file
//! in the same directory followed by a rename, so a crash mid-write leaves
//! the previous consistent file intact and readers in this process never see
//! a partial write.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::StoreError;

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) the storage directory. Failure here is the
    /// one fatal startup error the store recognizes.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads a file as an ordered line sequence; an absent file reads as empty.
    pub fn read_lines(&self, name: &str) -> Result<Vec<String>, StoreError> {
        match std::fs::read_to_string(self.dir.join(name)) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces a file's contents with the given lines.
    pub fn write_lines(&self, name: &str, lines: &[String]) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        for line in lines {
            writeln!(tmp, "{line}")?;
        }
        tmp.persist(self.dir.join(name)).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}
