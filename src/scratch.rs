use std::path::PathBuf;

use tempfile::TempDir;

use crate::error::Result;

/// Scratch area for one pipeline invocation. Every path is unique to the
/// owning `Scratch`, so concurrent invocations cannot collide on filenames,
/// and the directory is removed on drop regardless of how the run ended.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("bigkas-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
