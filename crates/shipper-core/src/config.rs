//! Function configuration and packaging options.
//!
//! The on-disk format is a `lambda.json` file next to the function's
//! source tree. It is deserialized with defaults applied and validated
//! before the pipeline mutates anything.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShipperError};
use crate::subscribers::EventSourceSpec;

/// Default name of the produced archive.
pub const DEFAULT_ZIPFILE_NAME: &str = "lambda_function.zip";

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "lambda.json";

/// How the packaging run obtains its isolated environment.
///
/// Exactly one strategy is active per run; the enum makes the
/// "at most one of build/reuse/skip" invariant structural.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvStrategy {
    /// Build a fresh environment under the scratch workspace.
    #[default]
    Provision,
    /// Reuse an existing environment after validating its shape.
    Existing(PathBuf),
    /// No environment at all; only source and declared extras are packaged.
    Skip,
}

/// Everything one packaging run needs, resolved up front and threaded
/// through the pipeline.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    /// Function source tree root; also where the archive lands.
    pub working_dir: PathBuf,
    /// File name of the archive, relative to `working_dir`.
    pub zipfile_name: String,
    /// Dependency specifiers handed to the installer.
    pub requirements: Vec<String>,
    /// Extra files or directories merged into the archive root.
    pub extra_files: Vec<PathBuf>,
    /// Exclusion patterns applied to archive-relative paths.
    pub ignore: Vec<String>,
    /// Environment strategy for this run.
    pub env: EnvStrategy,
}

impl PackageSpec {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            zipfile_name: DEFAULT_ZIPFILE_NAME.to_string(),
            requirements: Vec::new(),
            extra_files: Vec::new(),
            ignore: Vec::new(),
            env: EnvStrategy::default(),
        }
    }

    /// Where the finished archive will be written.
    pub fn zip_path(&self) -> PathBuf {
        self.working_dir.join(&self.zipfile_name)
    }
}

/// `virtualenv` field of the config file: a path reuses an existing
/// environment, `false` skips provisioning entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum VirtualenvSetting {
    Toggle(bool),
    Path(PathBuf),
}

/// Parsed `lambda.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub handler: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub extra_files: Vec<PathBuf>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub virtualenv: Option<VirtualenvSetting>,
    #[serde(default)]
    pub event_sources: Vec<EventSourceSpec>,
}

fn default_runtime() -> String {
    "python3.12".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_memory() -> u32 {
    128
}

impl FunctionConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: FunctionConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly deploy.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ShipperError::Configuration(
                "function name must not be empty".to_string(),
            ));
        }
        if self.handler.trim().is_empty() {
            return Err(ShipperError::Configuration(
                "handler must not be empty".to_string(),
            ));
        }
        if self.virtualenv == Some(VirtualenvSetting::Toggle(true)) {
            return Err(ShipperError::Configuration(
                "virtualenv must be a path or false; use omission to build a fresh one"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the `virtualenv` field into an [`EnvStrategy`].
    pub fn env_strategy(&self) -> EnvStrategy {
        match &self.virtualenv {
            None => EnvStrategy::Provision,
            Some(VirtualenvSetting::Toggle(false)) => EnvStrategy::Skip,
            Some(VirtualenvSetting::Path(p)) => EnvStrategy::Existing(p.clone()),
            // Rejected by validate(); treated as the default if reached.
            Some(VirtualenvSetting::Toggle(true)) => EnvStrategy::Provision,
        }
    }

    /// Build the packaging spec for this function rooted at `working_dir`.
    pub fn package_spec(&self, working_dir: impl Into<PathBuf>) -> PackageSpec {
        PackageSpec {
            working_dir: working_dir.into(),
            zipfile_name: DEFAULT_ZIPFILE_NAME.to_string(),
            requirements: self.requirements.clone(),
            extra_files: self.extra_files.clone(),
            ignore: self.ignore.clone(),
            env: self.env_strategy(),
        }
    }
}
