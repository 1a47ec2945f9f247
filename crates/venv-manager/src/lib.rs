//! Venv-Manager: isolated environment provisioning for lambda-shipper
//!
//! This crate guarantees that a usable, self-contained dependency
//! installation environment exists before packaging, and installs the
//! declared requirement list into it. It never touches the host's
//! global package set: installs are always directed at the
//! environment's own package directory.
//!
//! ## Environment/Tooling layer
//!
//! Focus: environment shape validation and installer process plumbing.

use std::path::{Path, PathBuf};
use std::process::Command;

mod error;

pub use error::{EnvError, Result};

/// Relative location of the installer binary inside an environment.
#[cfg(not(windows))]
pub const INSTALLER_RELATIVE_PATH: &str = "bin/pip";
#[cfg(windows)]
pub const INSTALLER_RELATIVE_PATH: &str = "Scripts/pip.exe";

/// Relative directory that batch installs are targeted at.
///
/// Using an explicit `--target` keeps the installed-package location
/// independent of the interpreter version baked into the environment.
pub const INSTALL_TARGET_RELATIVE_PATH: &str = "lib/site-packages";

/// A validated isolated environment on disk.
///
/// An `Environment` can only be obtained through [`Environment::open`],
/// which checks the expected internal structure, or through
/// [`PipInstaller::create`], which builds a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
}

impl Environment {
    /// Open an existing environment, validating its shape.
    ///
    /// Returns [`EnvError::InvalidEnvironment`] when the installer binary
    /// is not present at the conventional relative location. There is no
    /// fallback to creating a new environment: a caller that handed us a
    /// bad path gets a hard error.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(INSTALLER_RELATIVE_PATH).is_file() {
            return Err(EnvError::InvalidEnvironment(root));
        }
        Ok(Self { root })
    }

    /// Check whether `root` looks like a usable environment.
    pub fn is_valid(root: &Path) -> bool {
        root.join(INSTALLER_RELATIVE_PATH).is_file()
    }

    /// Root directory of the environment.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the installer binary.
    pub fn installer(&self) -> PathBuf {
        self.root.join(INSTALLER_RELATIVE_PATH)
    }

    /// Directory that new installs are targeted at.
    pub fn install_target(&self) -> PathBuf {
        self.root.join(INSTALL_TARGET_RELATIVE_PATH)
    }

    /// All installed-package directories of this environment that exist
    /// on disk.
    ///
    /// Covers the explicit install target plus any interpreter-versioned
    /// `lib/python*/site-packages` trees a reused environment already
    /// carries.
    pub fn package_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        let target = self.install_target();
        if target.is_dir() {
            dirs.push(target);
        }

        let lib = self.root.join("lib");
        if let Ok(entries) = std::fs::read_dir(&lib) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if !name.starts_with("python") {
                    continue;
                }
                let site = entry.path().join("site-packages");
                if site.is_dir() {
                    dirs.push(site);
                }
            }
        }

        dirs
    }
}

/// Installer strategy backed by `pip` inside a virtualenv.
///
/// One concrete strategy per platform packaging convention; this is the
/// Python one. `create` builds the environment with `<python> -m venv`,
/// `install` runs a single batch `pip install --target ...` spawn.
#[derive(Debug, Clone)]
pub struct PipInstaller {
    python: String,
}

impl Default for PipInstaller {
    fn default() -> Self {
        #[cfg(not(windows))]
        let python = "python3".to_string();
        #[cfg(windows)]
        let python = "python".to_string();
        Self { python }
    }
}

impl PipInstaller {
    /// Use a specific interpreter to build new environments.
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Create a fresh environment at `root` and validate it.
    pub fn create(&self, root: &Path) -> Result<Environment> {
        tracing::info!(env = %root.display(), "creating virtualenv");

        let mut cmd = Command::new(&self.python);
        cmd.arg("-m").arg("venv").arg(root);
        run_checked(cmd, format!("{} -m venv", self.python))?;

        Environment::open(root)
    }

    /// Install `deps` into the environment's package directory.
    ///
    /// An empty dependency list is a valid no-op: nothing is spawned.
    /// A non-zero installer exit aborts the run; there is no retry and
    /// no partial-success handling.
    pub fn install(&self, env: &Environment, deps: &[String]) -> Result<()> {
        if deps.is_empty() {
            tracing::debug!("no requirements declared, skipping install");
            return Ok(());
        }

        let target = env.install_target();
        std::fs::create_dir_all(&target)?;

        tracing::info!(
            env = %env.root().display(),
            count = deps.len(),
            "installing requirements"
        );

        let mut cmd = Command::new(env.installer());
        cmd.arg("install").arg("--target").arg(&target).args(deps);
        run_checked(cmd, "pip install".to_string())
    }
}

/// Run a command to completion, mapping spawn failure and non-zero exit
/// into [`EnvError`] with captured stderr.
fn run_checked(mut cmd: Command, label: String) -> Result<()> {
    let output = cmd.output().map_err(|e| EnvError::Spawn {
        command: label.clone(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(EnvError::InstallerFailed {
            command: label,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
