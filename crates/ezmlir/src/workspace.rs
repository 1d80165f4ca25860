//! Artifact workspace
//!
//! A [`Workspace`] is the directory that intermediate artifacts flow through
//! during one pipeline run. It is either caller-owned (an explicit directory
//! that outlives the run) or ephemeral (a fresh temporary directory). Either
//! way the run ends with exactly one [`Workspace::close`], which applies the
//! [`CleanupPolicy`]; dropping an unclosed workspace closes it.

use crate::common::PipelineResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What happens to the workspace contents on close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Temporary directory, removed recursively
    EphemeralDeleteOnExit,
    /// Nothing is removed
    PersistentKeep,
    /// Caller-owned directory: only files the workspace handed out are removed
    PersistentDeleteTrackedFiles,
}

/// Directory owning every intermediate artifact of one run
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    policy: CleanupPolicy,
    temp: Option<TempDir>,
    tracked: Vec<PathBuf>,
    closed: bool,
}

impl Workspace {
    /// Open a workspace in `explicit_dir`, or in a new temporary directory
    ///
    /// With `keep_temps` nothing is removed on close; an ephemeral directory
    /// is then left behind and its path logged.
    pub fn open(explicit_dir: Option<&Path>, keep_temps: bool) -> PipelineResult<Self> {
        match explicit_dir {
            Some(dir) => Self::persistent(dir, keep_temps),
            None if keep_temps => {
                let root = Self::create_temp()?.keep();
                tracing::warn!(root = %root.display(), "keeping intermediate files");
                Ok(Self::with_root(root, CleanupPolicy::PersistentKeep, None))
            }
            None => Self::ephemeral(),
        }
    }

    /// Fresh uniquely named directory, deleted on close
    pub fn ephemeral() -> PipelineResult<Self> {
        let temp = Self::create_temp()?;
        let root = temp.path().to_path_buf();
        Ok(Self::with_root(root, CleanupPolicy::EphemeralDeleteOnExit, Some(temp)))
    }

    /// Caller-owned directory, created if absent and never deleted itself
    pub fn persistent(dir: &Path, keep_temps: bool) -> PipelineResult<Self> {
        fs::create_dir_all(dir)?;
        let policy = if keep_temps {
            CleanupPolicy::PersistentKeep
        } else {
            CleanupPolicy::PersistentDeleteTrackedFiles
        };
        Ok(Self::with_root(dir.to_path_buf(), policy, None))
    }

    fn create_temp() -> io::Result<TempDir> {
        tempfile::Builder::new().prefix("ezmlir-").tempdir()
    }

    fn with_root(root: PathBuf, policy: CleanupPolicy, temp: Option<TempDir>) -> Self {
        tracing::debug!(root = %root.display(), ?policy, "opened workspace");
        Self {
            root,
            policy,
            temp,
            tracked: Vec::new(),
            closed: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Path for an artifact named `name` inside the workspace
    ///
    /// The path is tracked, so a tracked-files cleanup removes it even if a
    /// failing stage left it half written.
    pub fn artifact_path(&mut self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if !self.tracked.contains(&path) {
            self.tracked.push(path.clone());
        }
        path
    }

    /// Every path handed out by [`Workspace::artifact_path`], in order
    pub fn tracked(&self) -> &[PathBuf] {
        &self.tracked
    }

    /// Apply the cleanup policy. Calling it again does nothing.
    pub fn close(&mut self) -> PipelineResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.policy {
            CleanupPolicy::PersistentKeep => {
                tracing::debug!(root = %self.root.display(), "workspace kept");
            }
            CleanupPolicy::EphemeralDeleteOnExit => {
                if let Some(temp) = self.temp.take() {
                    temp.close()?;
                }
                tracing::debug!(root = %self.root.display(), "workspace removed");
            }
            CleanupPolicy::PersistentDeleteTrackedFiles => {
                let mut first_error = None;
                for path in &self.tracked {
                    match fs::remove_file(path) {
                        Ok(()) => tracing::debug!(path = %path.display(), "removed intermediate file"),
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                        Err(err) => {
                            tracing::warn!(path = %path.display(), error = %err, "cannot remove intermediate file");
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                    }
                }
                if let Some(err) = first_error {
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(root = %self.root.display(), error = %err, "workspace cleanup failed");
        }
    }
}
