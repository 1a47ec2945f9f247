//! End-to-end packaging pipeline tests over real scratch directories.

use std::fs::File;
use std::path::Path;

use shipper_core::{build_package, EnvStrategy, PackageSpec, Workspace};

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn entry_names(zip_path: &Path) -> Vec<String> {
    let file = File::open(zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

/// Extra file `dummyfile`, no ignore rules: the archive lands at
/// `<working_dir>/lambda_function.zip` with `dummyfile` at its root.
#[test]
fn extra_file_is_packaged_at_archive_root() {
    let work = tempfile::tempdir().unwrap();
    let extras = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "def handler(): pass");
    let dummy = extras.path().join("dummyfile");
    write(&dummy, "dummy");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;
    spec.extra_files.push(dummy);

    let built = build_package(&spec).unwrap();
    assert_eq!(built.path, work.path().join("lambda_function.zip"));
    assert_eq!(entry_names(&built.path), vec!["dummyfile", "handler.py"]);
}

/// Hidden-file exclusion: the dotfile rule drops `.dotfile` from an
/// extra directory while its non-hidden siblings survive.
#[test]
fn dotfile_rule_excludes_hidden_extras() {
    let work = tempfile::tempdir().unwrap();
    let extras = tempfile::tempdir().unwrap();
    let extra_dir = extras.path().join("extra");
    write(&extra_dir.join(".dotfile"), "hidden");
    write(&extra_dir.join("visible.txt"), "shown");
    write(&extra_dir.join("foo/__init__.py"), "");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;
    spec.extra_files.push(extra_dir);
    spec.ignore.push(r"^\.[^.].*".to_string());

    let built = build_package(&spec).unwrap();
    let names = entry_names(&built.path);
    assert!(!names.iter().any(|n| n.contains(".dotfile")), "{names:?}");
    assert!(names.contains(&"extra/visible.txt".to_string()));
    assert!(names.contains(&"extra/foo/__init__.py".to_string()));
}

/// Mixed ignore rules: `.pyc` artifacts go, untouched sources stay.
#[test]
fn ignore_rules_drop_matching_and_keep_the_rest() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("real.py"), "");
    write(&work.path().join("fake.pyc"), "");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;
    spec.ignore.push("dummy.*".to_string());
    spec.ignore.push(r"[a-z]+\.pyc".to_string());

    let built = build_package(&spec).unwrap();
    let names = entry_names(&built.path);
    assert!(!names.contains(&"fake.pyc".to_string()));
    assert!(names.contains(&"real.py".to_string()));
}

/// Two runs over identical inputs produce byte-identical archives, and
/// a prior run's artifact never leaks into the next one.
#[test]
fn rebuild_is_idempotent() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "def handler(): pass");
    write(&work.path().join("pkg/util.py"), "x = 1");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;

    let first = build_package(&spec).unwrap();
    let first_bytes = std::fs::read(&first.path).unwrap();

    let second = build_package(&spec).unwrap();
    let second_bytes = std::fs::read(&second.path).unwrap();

    assert_eq!(first.digest, second.digest);
    assert_eq!(first_bytes, second_bytes);
    assert!(!entry_names(&second.path)
        .iter()
        .any(|n| n.ends_with(".zip")));
}

#[test]
fn custom_zipfile_name_is_honored() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;
    spec.zipfile_name = "test.zip".to_string();

    let built = build_package(&spec).unwrap();
    assert_eq!(built.path, work.path().join("test.zip"));
    assert!(built.path.is_file());
}

/// Reusing a shaped environment merges its installed packages into the
/// archive; an empty requirement list spawns no installer.
#[test]
fn existing_environment_contributes_its_packages() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "");

    let venv = tempfile::tempdir().unwrap();
    write(
        &venv.path().join(venv_manager::INSTALLER_RELATIVE_PATH),
        "",
    );
    write(
        &venv.path().join("lib/python3.11/site-packages/requests/__init__.py"),
        "",
    );

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Existing(venv.path().to_path_buf());

    let built = build_package(&spec).unwrap();
    let names = entry_names(&built.path);
    assert!(names.contains(&"requests/__init__.py".to_string()));
    assert!(names.contains(&"handler.py".to_string()));
}

/// With no requirements and the default strategy, the archive holds
/// only source and declared extras — no dependency tree.
#[test]
fn empty_requirements_archive_has_no_dependency_files() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "");

    let spec = PackageSpec::new(work.path());
    let built = build_package(&spec).unwrap();
    assert_eq!(entry_names(&built.path), vec!["handler.py"]);
}

/// The workspace survives a successful run for inspection and `clean`
/// removes it on demand.
#[test]
fn workspace_left_in_place_then_cleaned() {
    let work = tempfile::tempdir().unwrap();
    write(&work.path().join("handler.py"), "");

    let mut spec = PackageSpec::new(work.path());
    spec.env = EnvStrategy::Skip;
    build_package(&spec).unwrap();

    let ws = Workspace::new(work.path());
    assert!(ws.root().is_dir());
    ws.clean().unwrap();
    assert!(!ws.root().exists());
}
