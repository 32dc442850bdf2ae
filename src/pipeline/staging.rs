//! Per-video staging workspace lifecycle.
//!
//! Each pipeline invocation owns exactly one workspace directory, created before
//! frame extraction and removed after reassembly regardless of outcome. The
//! `Drop` guard makes removal run on every exit path once the workspace exists.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StagingError;

/// Lifecycle states of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// Directory exists, nothing staged yet
    Created,
    /// Frames have been staged into it
    Populated,
    /// Staged content has been consumed downstream
    Consumed,
    /// Directory removed
    Cleaned,
}

/// A temporary directory scoped to exactly one input video
#[derive(Debug)]
pub struct StagingWorkspace {
    dir: PathBuf,
    state: WorkspaceState,
}

impl StagingWorkspace {
    /// Create the workspace directory for the given video stem
    pub fn create(root: &Path, stem: &str) -> Result<Self, StagingError> {
        let dir = root.join(stem);
        std::fs::create_dir_all(&dir).map_err(|error| StagingError::CreateFailed {
            path: dir.display().to_string(),
            reason: error.to_string(),
        })?;

        debug!("created workspace {}", dir.display());
        Ok(Self {
            dir,
            state: WorkspaceState::Created,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Directory receiving disk-staged frame files
    pub fn frames_dir(&self) -> Result<PathBuf, StagingError> {
        self.subdir("frames")
    }

    /// Directory used to exchange frames with the inference runner
    pub fn exchange_dir(&self) -> Result<PathBuf, StagingError> {
        self.subdir("exchange")
    }

    fn subdir(&self, name: &str) -> Result<PathBuf, StagingError> {
        let dir = self.dir.join(name);
        std::fs::create_dir_all(&dir).map_err(|error| StagingError::CreateFailed {
            path: dir.display().to_string(),
            reason: error.to_string(),
        })?;
        Ok(dir)
    }

    pub fn mark_populated(&mut self) {
        self.state = WorkspaceState::Populated;
    }

    pub fn mark_consumed(&mut self) {
        self.state = WorkspaceState::Consumed;
    }

    /// Remove the workspace directory.
    ///
    /// Idempotent: cleaning an already-clean workspace is a no-op, and a
    /// directory someone else already removed counts as clean.
    pub fn cleanup(&mut self) -> Result<(), StagingError> {
        if self.state == WorkspaceState::Cleaned {
            return Ok(());
        }

        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(StagingError::CleanupFailed {
                    path: self.dir.display().to_string(),
                    reason: error.to_string(),
                });
            }
        }

        debug!("cleaned workspace {}", self.dir.display());
        self.state = WorkspaceState::Cleaned;
        Ok(())
    }
}

impl Drop for StagingWorkspace {
    fn drop(&mut self) {
        if let Err(error) = self.cleanup() {
            warn!("workspace cleanup on drop failed: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_populate_consume_clean() {
        let root = tempdir().unwrap();
        let mut ws = StagingWorkspace::create(root.path(), "clip").unwrap();
        assert_eq!(ws.state(), WorkspaceState::Created);
        assert!(ws.path().is_dir());

        let frames = ws.frames_dir().unwrap();
        assert!(frames.is_dir());
        ws.mark_populated();
        assert_eq!(ws.state(), WorkspaceState::Populated);

        ws.mark_consumed();
        ws.cleanup().unwrap();
        assert_eq!(ws.state(), WorkspaceState::Cleaned);
        assert!(!frames.exists());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let root = tempdir().unwrap();
        let mut ws = StagingWorkspace::create(root.path(), "clip").unwrap();
        ws.frames_dir().unwrap();

        ws.cleanup().unwrap();
        ws.cleanup().unwrap();
        assert!(!root.path().join("clip").exists());
    }

    #[test]
    fn cleanup_tolerates_external_removal() {
        let root = tempdir().unwrap();
        let mut ws = StagingWorkspace::create(root.path(), "clip").unwrap();

        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.cleanup().unwrap();
        assert_eq!(ws.state(), WorkspaceState::Cleaned);
    }

    #[test]
    fn drop_removes_workspace() {
        let root = tempdir().unwrap();
        let path;
        {
            let ws = StagingWorkspace::create(root.path(), "clip").unwrap();
            path = ws.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
