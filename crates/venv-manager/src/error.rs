//! Error types for venv-manager

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors that can occur while provisioning an isolated environment.
#[derive(Error, Debug)]
pub enum EnvError {
    /// The path given for an existing environment does not contain an
    /// installer binary at the expected location.
    #[error("not a usable environment: no installer found under {0}")]
    InvalidEnvironment(PathBuf),

    /// The interpreter or installer binary could not be spawned at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The spawned installer ran but exited non-zero.
    #[error("`{command}` exited with {status}: {stderr}")]
    InstallerFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for environment provisioning operations.
pub type Result<T> = std::result::Result<T, EnvError>;
