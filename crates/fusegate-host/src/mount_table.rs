// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Persisted list of mounts, re-established at startup

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::mount::MountArgs;

#[derive(Debug, Error)]
pub enum MountTableError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode mount table: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON mount list with a one-deep backup.
#[derive(Clone, Debug)]
pub struct MountTable {
    save_to: PathBuf,
    backup_to: PathBuf,
}

impl MountTable {
    pub fn new(save_to: impl Into<PathBuf>, backup_to: impl Into<PathBuf>) -> Self {
        Self {
            save_to: save_to.into(),
            backup_to: backup_to.into(),
        }
    }

    pub fn save_path(&self) -> &Path {
        &self.save_to
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_to
    }

    /// Saved mounts. A missing or undecodable file is an empty table.
    pub fn load(&self) -> Result<Vec<MountArgs>, MountTableError> {
        let content = match fs::read(&self.save_to) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MountTableError::Read {
                    path: self.save_to.clone(),
                    source,
                })
            }
        };
        match serde_json::from_slice(&content) {
            Ok(mounts) => Ok(mounts),
            Err(err) => {
                debug!(operation = "mount_table_load", path = %self.save_to.display(), error = %err, "ignoring undecodable mount table");
                Ok(Vec::new())
            }
        }
    }

    /// Copy the current save file over the backup, then rewrite the save file.
    ///
    /// Both files are replaced by rename, so readers never see a partial write.
    /// Callers serialize saves to the same table.
    pub fn save(&self, mounts: &[MountArgs]) -> Result<(), MountTableError> {
        let previous = match fs::read(&self.save_to) {
            Ok(previous) => previous,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(MountTableError::Read {
                    path: self.save_to.clone(),
                    source,
                })
            }
        };
        replace(&self.backup_to, &previous)?;

        let encoded = serde_json::to_vec(mounts)?;
        replace(&self.save_to, &encoded)?;
        debug!(operation = "mount_table_save", path = %self.save_to.display(), mounts = mounts.len(), "mount table saved");
        Ok(())
    }
}

/// Write `contents` next to `path`, then rename it into place.
fn replace(path: &Path, contents: &[u8]) -> Result<(), MountTableError> {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);
    fs::write(&staged, contents).map_err(write_error(&staged))?;
    fs::rename(&staged, path).map_err(write_error(path))
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> MountTableError {
    let path = path.to_path_buf();
    move |source| MountTableError::Write { path, source }
}
