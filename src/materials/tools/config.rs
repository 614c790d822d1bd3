//! Working directory resolution.
//!
//! Resolution order:
//! 1. An explicit directory (the `--dir` flag or `MATERIALS_DIR`)
//! 2. The platform download directory
//! 3. `$HOME/Downloads`

use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};

use crate::materials::tools::error::{Result, ToolError};

/// Runtime settings shared by the CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory the exports are read from and the reports written to.
    pub directory: PathBuf,
}

impl Settings {
    /// Resolves the working directory, preferring an explicit override.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let directory = match explicit {
            Some(directory) => directory,
            None => default_directory()?,
        };
        Ok(Self { directory })
    }

    /// Settings rooted at the given directory (useful for testing).
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Resolves a file name relative to the working directory. Absolute
    /// paths are kept as they are.
    pub fn resolve_input(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.directory.join(name)
        }
    }
}

fn default_directory() -> Result<PathBuf> {
    let downloads = UserDirs::new().and_then(|dirs| dirs.download_dir().map(Path::to_path_buf));
    if let Some(downloads) = downloads {
        return Ok(downloads);
    }
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join("Downloads"))
        .ok_or(ToolError::NoDefaultDirectory)
}
