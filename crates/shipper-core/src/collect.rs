//! File collection and filtering.
//!
//! Produces the final set of archive-relative paths for one packaging
//! run. Sources are merged in precedence order into a `BTreeMap`, so a
//! later source overwrites an earlier one at the same relative path and
//! iteration order is deterministic:
//!
//! 1. the working directory's own tree (minus the scratch workspace and
//!    the output archive itself),
//! 2. every installed-package directory of the environment,
//! 3. every explicitly declared extra file or directory.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::PackageSpec;
use crate::error::{Result, ShipperError};
use crate::ignore::IgnoreRuleSet;
use crate::workspace::Workspace;

/// Archive-relative path (forward slashes) to source file on disk.
pub type CandidateSet = BTreeMap<String, PathBuf>;

/// Assemble the full candidate set for a run, before filtering.
pub fn collect_candidates(
    spec: &PackageSpec,
    workspace: &Workspace,
    package_dirs: &[PathBuf],
) -> Result<CandidateSet> {
    let mut candidates = CandidateSet::new();

    collect_source_tree(spec, workspace, &mut candidates)?;

    for dir in package_dirs {
        merge_tree(dir, None, &mut candidates)?;
    }

    for extra in &spec.extra_files {
        collect_extra(extra, &mut candidates)?;
    }

    tracing::debug!(count = candidates.len(), "candidate set assembled");
    Ok(candidates)
}

/// Drop every candidate matching an ignore rule.
///
/// With no rules this is the identity; directories that become empty
/// simply never reach the archive, which carries no directory entries.
pub fn apply_ignore(candidates: CandidateSet, rules: &IgnoreRuleSet) -> CandidateSet {
    if rules.is_empty() {
        return candidates;
    }
    let before = candidates.len();
    let kept: CandidateSet = candidates
        .into_iter()
        .filter(|(rel, _)| !rules.is_ignored(rel))
        .collect();
    tracing::debug!(dropped = before - kept.len(), kept = kept.len(), "ignore rules applied");
    kept
}

/// Copy the filtered set into the staging tree.
pub fn stage(candidates: &CandidateSet, staging: &Path) -> Result<()> {
    for (rel, src) in candidates {
        let dst = staging.join(rel_as_path(rel));
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, &dst)?;
    }
    Ok(())
}

fn collect_source_tree(
    spec: &PackageSpec,
    workspace: &Workspace,
    candidates: &mut CandidateSet,
) -> Result<()> {
    let root = &spec.working_dir;
    let zip_path = spec.zip_path();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        // The scratch workspace must never package itself.
        .filter_entry(|e| e.path() != workspace.root());

    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        // A prior run's archive would otherwise end up inside the next one.
        if entry.path() == zip_path {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walked path is under its root");
        candidates.insert(archive_rel(rel), entry.path().to_path_buf());
    }
    Ok(())
}

/// Merge a tree rooted at `dir` into the set, optionally prefixed.
fn merge_tree(dir: &Path, prefix: Option<&str>, candidates: &mut CandidateSet) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walked path is under its root");
        let mut key = archive_rel(rel);
        if let Some(prefix) = prefix {
            key = format!("{prefix}/{key}");
        }
        candidates.insert(key, entry.path().to_path_buf());
    }
    Ok(())
}

fn collect_extra(extra: &Path, candidates: &mut CandidateSet) -> Result<()> {
    let name = extra
        .file_name()
        .ok_or_else(|| {
            ShipperError::Configuration(format!(
                "extra file has no usable name: {}",
                extra.display()
            ))
        })?
        .to_string_lossy()
        .into_owned();

    if extra.is_file() {
        candidates.insert(name, extra.to_path_buf());
        Ok(())
    } else if extra.is_dir() {
        // Recursive, hidden entries included.
        merge_tree(extra, Some(&name), candidates)
    } else {
        Err(ShipperError::Configuration(format!(
            "extra file does not exist: {}",
            extra.display()
        )))
    }
}

/// Render a relative path the way it will appear inside the archive.
fn archive_rel(rel: &Path) -> String {
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

fn rel_as_path(rel: &str) -> PathBuf {
    rel.split('/').collect()
}

fn walk_error(e: walkdir::Error) -> ShipperError {
    match e.into_io_error() {
        Some(io) => ShipperError::Io(io),
        None => ShipperError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "directory walk failed",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn source_tree_skips_workspace_and_prior_archive() {
        let dir = tempdir().unwrap();
        let spec = PackageSpec::new(dir.path());
        let ws = Workspace::new(dir.path());
        ws.prepare().unwrap();

        write(&dir.path().join("handler.py"), "def handler(): pass");
        write(&ws.staging().join("stale.py"), "should not appear");
        write(&spec.zip_path(), "previous artifact");

        let set = collect_candidates(&spec, &ws, &[]).unwrap();
        let keys: Vec<_> = set.keys().cloned().collect();
        assert_eq!(keys, vec!["handler.py"]);
    }

    #[test]
    fn later_sources_overwrite_earlier_at_same_path() {
        let dir = tempdir().unwrap();
        let spec = PackageSpec::new(dir.path());
        let ws = Workspace::new(dir.path());
        ws.prepare().unwrap();

        write(&dir.path().join("six.py"), "from source tree");
        let site = tempdir().unwrap();
        write(&site.path().join("six.py"), "from site-packages");

        let set = collect_candidates(&spec, &ws, &[site.path().to_path_buf()]).unwrap();
        assert_eq!(set["six.py"], site.path().join("six.py"));
    }

    #[test]
    fn extra_file_lands_at_archive_root() {
        let dir = tempdir().unwrap();
        let spec_dir = tempdir().unwrap();
        let mut spec = PackageSpec::new(spec_dir.path());
        let ws = Workspace::new(spec_dir.path());
        ws.prepare().unwrap();

        let dummy = dir.path().join("dummyfile");
        write(&dummy, "x");
        spec.extra_files.push(dummy);

        let set = collect_candidates(&spec, &ws, &[]).unwrap();
        assert!(set.contains_key("dummyfile"));
    }

    #[test]
    fn extra_directory_copies_recursively_with_hidden_entries() {
        let extras = tempdir().unwrap();
        let extra_dir = extras.path().join("extra");
        write(&extra_dir.join("foo/__init__.py"), "");
        write(&extra_dir.join(".dotfile"), "hidden");

        let work = tempdir().unwrap();
        let mut spec = PackageSpec::new(work.path());
        spec.extra_files.push(extra_dir);
        let ws = Workspace::new(work.path());
        ws.prepare().unwrap();

        let set = collect_candidates(&spec, &ws, &[]).unwrap();
        assert!(set.contains_key("extra/foo/__init__.py"));
        assert!(set.contains_key("extra/.dotfile"));
    }

    #[test]
    fn missing_extra_is_configuration_error() {
        let work = tempdir().unwrap();
        let mut spec = PackageSpec::new(work.path());
        spec.extra_files.push(PathBuf::from("no/such/thing"));
        let ws = Workspace::new(work.path());
        ws.prepare().unwrap();

        let err = collect_candidates(&spec, &ws, &[]).unwrap_err();
        assert!(matches!(err, ShipperError::Configuration(_)));
    }

    #[test]
    fn filtering_is_exactly_the_unmatched_subset() {
        let mut candidates = CandidateSet::new();
        for p in ["keep.py", "fake.pyc", "pkg/other.pyc", "pkg/mod.py"] {
            candidates.insert(p.to_string(), PathBuf::from(p));
        }
        let rules = IgnoreRuleSet::compile(&[r"[a-z]+\.pyc".to_string()]).unwrap();
        let kept = apply_ignore(candidates, &rules);
        let keys: Vec<_> = kept.keys().cloned().collect();
        assert_eq!(keys, vec!["keep.py", "pkg/mod.py"]);
    }

    #[test]
    fn stage_materializes_nested_paths() {
        let src = tempdir().unwrap();
        write(&src.path().join("a.py"), "a");
        let mut candidates = CandidateSet::new();
        candidates.insert("pkg/deep/a.py".to_string(), src.path().join("a.py"));

        let staging = tempdir().unwrap();
        stage(&candidates, staging.path()).unwrap();
        assert!(staging.path().join("pkg/deep/a.py").is_file());
    }
}
