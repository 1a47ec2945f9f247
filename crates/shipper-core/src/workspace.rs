//! Scratch workspace lifecycle.
//!
//! One packaging run exclusively owns one workspace. The workspace is
//! recreated from scratch at the start of every run and deliberately
//! left in place afterwards so a failed or surprising build can be
//! inspected; `clean` removes it on demand.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the scratch directory nested under the working directory.
pub const SCRATCH_DIR_NAME: &str = ".lambda_shipper";

/// Subdirectory holding the to-be-archived file tree.
pub const STAGING_DIR_NAME: &str = "staging";

/// Subdirectory a freshly provisioned environment is created in.
pub const ENV_DIR_NAME: &str = "venv";

/// Directories owned by one packaging run, computed once from the
/// working directory and threaded through every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    staging: PathBuf,
    env_dir: PathBuf,
}

impl Workspace {
    pub fn new(working_dir: &Path) -> Self {
        let root = working_dir.join(SCRATCH_DIR_NAME);
        let staging = root.join(STAGING_DIR_NAME);
        let env_dir = root.join(ENV_DIR_NAME);
        Self {
            root,
            staging,
            env_dir,
        }
    }

    /// Scratch root, `<working_dir>/.lambda_shipper`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging subtree the archive is assembled from.
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Where a freshly provisioned environment lives.
    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    /// Ensure the scratch tree exists and is empty.
    ///
    /// Clears any prior run's contents first, then recreates the staging
    /// subtree. Only ever writes under the working directory.
    pub fn prepare(&self) -> Result<()> {
        self.clean()?;
        std::fs::create_dir_all(&self.staging)?;
        tracing::debug!(root = %self.root.display(), "workspace prepared");
        Ok(())
    }

    /// Recursively remove the scratch tree. Safe when it does not exist.
    pub fn clean(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
