//! The packaging pipeline.
//!
//! Wires workspace preparation, environment provisioning, collection,
//! filtering, staging and archiving into one run. Thin by design: each
//! stage lives in its own module and this orchestrator only decides
//! ordering and threads the [`Workspace`] value through.

use venv_manager::{Environment, PipInstaller};

use crate::archive::{write_archive, BuiltArchive};
use crate::collect::{apply_ignore, collect_candidates, stage};
use crate::config::{EnvStrategy, PackageSpec};
use crate::error::Result;
use crate::ignore::IgnoreRuleSet;
use crate::workspace::Workspace;

/// Build the deployment archive described by `spec`.
///
/// Configuration problems (bad ignore pattern, invalid explicit
/// environment path) are detected before the scratch workspace is
/// touched. On success the workspace is left in place for inspection
/// and the archive sits at [`PackageSpec::zip_path`].
pub fn build_package(spec: &PackageSpec) -> Result<BuiltArchive> {
    build_package_with(spec, &PipInstaller::default())
}

/// Same as [`build_package`] with an explicit installer strategy.
pub fn build_package_with(spec: &PackageSpec, installer: &PipInstaller) -> Result<BuiltArchive> {
    let rules = IgnoreRuleSet::compile(&spec.ignore)?;
    let workspace = Workspace::new(&spec.working_dir);

    let package_dirs = match &spec.env {
        EnvStrategy::Skip => {
            workspace.prepare()?;
            tracing::debug!("environment provisioning skipped");
            Vec::new()
        }
        EnvStrategy::Existing(path) => {
            // Validate the caller-supplied environment before any
            // filesystem mutation; a bad path must not leave a
            // half-prepared workspace.
            let env = Environment::open(path)?;
            workspace.prepare()?;
            installer.install(&env, &spec.requirements)?;
            env.package_dirs()
        }
        EnvStrategy::Provision => {
            workspace.prepare()?;
            if spec.requirements.is_empty() {
                // Nothing to install; a fresh environment would only
                // contribute its own bootstrap packages.
                Vec::new()
            } else {
                let env = installer.create(workspace.env_dir())?;
                installer.install(&env, &spec.requirements)?;
                // Only the explicit install target: the interpreter's
                // bootstrap site-packages never enter the archive.
                vec![env.install_target()]
            }
        }
    };

    let candidates = collect_candidates(spec, &workspace, &package_dirs)?;
    let filtered = apply_ignore(candidates, &rules);
    stage(&filtered, workspace.staging())?;

    write_archive(workspace.staging(), &spec.zip_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvStrategy;
    use crate::error::ShipperError;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn invalid_existing_environment_leaves_working_dir_untouched() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("handler.py"), "h");

        let mut spec = PackageSpec::new(dir.path());
        spec.env = EnvStrategy::Existing(dir.path().join("not-a-venv"));

        let err = build_package(&spec).unwrap_err();
        assert!(matches!(err, ShipperError::Configuration(_)));
        assert!(!Workspace::new(dir.path()).root().exists());
        assert!(!spec.zip_path().exists());
    }

    #[test]
    fn bad_ignore_pattern_fails_before_any_mutation() {
        let dir = tempdir().unwrap();
        let mut spec = PackageSpec::new(dir.path());
        spec.ignore.push("[broken".to_string());

        let err = build_package(&spec).unwrap_err();
        assert!(matches!(err, ShipperError::Configuration(_)));
        assert!(!Workspace::new(dir.path()).root().exists());
    }

    #[test]
    fn skip_strategy_packages_source_only() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("handler.py"), "h");

        let mut spec = PackageSpec::new(dir.path());
        spec.env = EnvStrategy::Skip;

        let built = build_package(&spec).unwrap();
        assert!(spec.zip_path().is_file());
        assert_eq!(built.file_count, 1);
    }

    #[test]
    fn empty_requirements_provision_is_a_noop() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("handler.py"), "h");

        // Default strategy provisions, but with nothing to install no
        // interpreter is ever spawned and no dependency tree is staged.
        let spec = PackageSpec::new(dir.path());
        let built = build_package(&spec).unwrap();
        assert_eq!(built.file_count, 1);
    }
}
