//! Snapshot capture.
//!
//! The live store is held open by the client with an exclusive lock, so the
//! engine never reads it in place. [`Snapshot::capture`] copies the store
//! directory to a private temporary location, skipping the lock files that
//! mark an active writer, and cleans the copy up when dropped. Whatever
//! reads the copy afterwards observes a fully-written, point-in-time state.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::SnapshotConfig;
use crate::error::ExtractError;

/// A private, point-in-time copy of a store directory. Removing it is tied
/// to this handle's lifetime.
#[derive(Debug)]
pub struct Snapshot {
    dir: TempDir,
    path: PathBuf,
    pub files_copied: usize,
    pub files_skipped: usize,
}

impl Snapshot {
    /// Copy `store_dir` into a fresh temporary directory.
    ///
    /// Fails with [`ExtractError::SnapshotUnavailable`] when the source is
    /// missing or unreadable; a partial copy is never handed out.
    pub fn capture(store_dir: &Path, config: &SnapshotConfig) -> Result<Self, ExtractError> {
        if !store_dir.is_dir() {
            return Err(ExtractError::snapshot(store_dir, "not a directory"));
        }

        let dir = TempDir::with_prefix("chatsift-snapshot-")
            .map_err(|e| ExtractError::snapshot(store_dir, e))?;
        let target = dir.path().join(
            store_dir
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("store")),
        );

        let mut files_copied = 0;
        let mut files_skipped = 0;

        for entry in WalkDir::new(store_dir).follow_links(false) {
            let entry = entry.map_err(|e| ExtractError::snapshot(store_dir, e))?;
            let relative = entry
                .path()
                .strip_prefix(store_dir)
                .map_err(|e| ExtractError::snapshot(store_dir, e))?;
            let dest = target.join(relative);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)
                    .map_err(|e| ExtractError::snapshot(store_dir, e))?;
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if is_skipped(&name, &config.skip_files) {
                debug!(file = %name, "skipping lock file in snapshot");
                files_skipped += 1;
                continue;
            }

            std::fs::copy(entry.path(), &dest).map_err(|e| ExtractError::snapshot(store_dir, e))?;
            files_copied += 1;
        }

        Ok(Self {
            dir,
            path: target,
            files_copied,
            files_skipped,
        })
    }

    /// Path of the copied store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disable cleanup and leave the copy on disk, returning its path.
    pub fn persist(self) -> PathBuf {
        let _ = self.dir.keep();
        self.path
    }
}

/// A skip pattern is either an exact file name or a `*.suffix` glob.
fn is_skipped(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| {
        if let Some(suffix) = p.strip_prefix('*') {
            name.ends_with(suffix)
        } else {
            name == p
        }
    })
}
