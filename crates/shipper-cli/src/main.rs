//! lambda-shipper - package serverless functions for deployment
//!
//! ## Commands
//!
//! - `package`: build the deployment archive for a function directory
//! - `clean`: remove the scratch workspace left by a previous run
//! - `check`: load and validate the function configuration
//!
//! Uploading the archive and reconciling event-source triggers against
//! a live service are driven through the `shipper-core` library by a
//! concrete cloud client; this binary covers the local workflow.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use shipper_core::{
    build_package_with, init_tracing, EnvStrategy, FunctionConfig, PackageSpec, Workspace,
    DEFAULT_CONFIG_FILE,
};
use venv_manager::PipInstaller;

#[derive(Parser)]
#[command(name = "lambda-shipper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Package serverless functions and their dependencies", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment archive
    Package {
        /// Function directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Configuration file (default: lambda.json in the function directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the archive file name
        #[arg(long)]
        zipfile: Option<String>,

        /// Additional file or directory to merge into the archive (repeatable)
        #[arg(long = "extra-file")]
        extra_files: Vec<PathBuf>,

        /// Additional dependency specifier to install (repeatable)
        #[arg(long = "requirement")]
        requirements: Vec<String>,

        /// Additional exclusion pattern (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Reuse an existing virtualenv instead of building one
        #[arg(long, conflicts_with = "no_virtualenv")]
        virtualenv: Option<PathBuf>,

        /// Skip the virtualenv entirely; package only source and extras
        #[arg(long)]
        no_virtualenv: bool,

        /// Interpreter used to build a fresh virtualenv
        #[arg(long, default_value = "python3")]
        python: String,
    },

    /// Remove the scratch workspace
    Clean {
        /// Function directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate the function configuration and print a summary
    Check {
        /// Function directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Configuration file (default: lambda.json in the function directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Package {
            path,
            config,
            zipfile,
            extra_files,
            requirements,
            ignore,
            virtualenv,
            no_virtualenv,
            python,
        } => cmd_package(
            &path,
            config,
            zipfile,
            extra_files,
            requirements,
            ignore,
            virtualenv,
            no_virtualenv,
            &python,
        ),
        Commands::Clean { path } => cmd_clean(&path),
        Commands::Check { path, config } => cmd_check(&path, config),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_package(
    path: &PathBuf,
    config: Option<PathBuf>,
    zipfile: Option<String>,
    extra_files: Vec<PathBuf>,
    requirements: Vec<String>,
    ignore: Vec<String>,
    virtualenv: Option<PathBuf>,
    no_virtualenv: bool,
    python: &str,
) -> Result<()> {
    let mut spec = load_spec(path, config)?;

    if let Some(name) = zipfile {
        spec.zipfile_name = name;
    }
    spec.extra_files.extend(extra_files);
    spec.requirements.extend(requirements);
    spec.ignore.extend(ignore);

    if no_virtualenv {
        spec.env = EnvStrategy::Skip;
    } else if let Some(venv) = virtualenv {
        spec.env = EnvStrategy::Existing(venv);
    }

    let built = build_package_with(&spec, &PipInstaller::new(python))
        .context("packaging failed")?;

    println!("archive: {}", built.path.display());
    println!("files:   {}", built.file_count);
    println!("sha256:  {}", built.digest);
    Ok(())
}

fn cmd_clean(path: &PathBuf) -> Result<()> {
    let workspace = Workspace::new(path);
    workspace.clean().context("failed to remove workspace")?;
    println!("removed {}", workspace.root().display());
    Ok(())
}

fn cmd_check(path: &PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config_path = config.unwrap_or_else(|| path.join(DEFAULT_CONFIG_FILE));
    let function = FunctionConfig::load(&config_path)
        .with_context(|| format!("invalid configuration at {}", config_path.display()))?;

    println!("name:          {}", function.name);
    println!("handler:       {}", function.handler);
    println!("runtime:       {}", function.runtime);
    println!("requirements:  {}", function.requirements.len());
    println!("event sources: {}", function.event_sources.len());
    println!("ok");
    Ok(())
}

/// Build the packaging spec from the config file when present,
/// otherwise from bare defaults for the directory.
fn load_spec(path: &PathBuf, config: Option<PathBuf>) -> Result<PackageSpec> {
    let config_path = config.unwrap_or_else(|| path.join(DEFAULT_CONFIG_FILE));
    if config_path.is_file() {
        let function = FunctionConfig::load(&config_path)
            .with_context(|| format!("invalid configuration at {}", config_path.display()))?;
        tracing::debug!(function = %function.name, "configuration loaded");
        Ok(function.package_spec(path))
    } else {
        tracing::debug!(dir = %path.display(), "no configuration file, using defaults");
        Ok(PackageSpec::new(path))
    }
}
