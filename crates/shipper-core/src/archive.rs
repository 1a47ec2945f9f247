//! Deterministic zip assembly.
//!
//! Entry names are the staging-relative paths produced by collection;
//! nothing absolute and nothing above the staging root can enter the
//! archive. Entries carry a fixed timestamp so two runs over identical
//! inputs produce identical bytes, and the archive is written to a
//! temporary file that atomically replaces the destination, so a failed
//! build never leaves a truncated artifact behind.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Result, ShipperError};

/// The finished artifact.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    /// Final archive location.
    pub path: PathBuf,
    /// Number of file entries written.
    pub file_count: usize,
    /// SHA-256 of the archive bytes, hex encoded.
    pub digest: String,
}

/// Zip the staging tree into `dest`, replacing any prior archive there.
pub fn write_archive(staging: &Path, dest: &Path) -> Result<BuiltArchive> {
    let parent = dest.parent().filter(|p| !p.as_os_str().is_empty()).map_or_else(
        || PathBuf::from("."),
        Path::to_path_buf,
    );

    let tmp = NamedTempFile::new_in(&parent)?;
    let mut zip = ZipWriter::new(tmp);
    let mut file_count = 0usize;

    let walker = WalkDir::new(staging)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => ShipperError::Io(io),
            None => ShipperError::Io(io::Error::new(io::ErrorKind::Other, "walk failed")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(staging)
            .expect("staged path is under the staging root");
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name.as_str(), entry_options(entry.path()))?;
        let mut src = File::open(entry.path())?;
        io::copy(&mut src, &mut zip)?;
        file_count += 1;
    }

    let tmp = zip.finish()?;
    tmp.persist(dest).map_err(|e| ShipperError::Io(e.error))?;

    let digest = file_digest(dest)?;
    tracing::info!(archive = %dest.display(), files = file_count, %digest, "archive written");

    Ok(BuiltArchive {
        path: dest.to_path_buf(),
        file_count,
        digest,
    })
}

/// Deflate, fixed timestamp, source file mode preserved on Unix.
fn entry_options(path: &Path) -> FileOptions {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            return options.unix_permissions(meta.permissions().mode() & 0o777);
        }
    }
    #[cfg(not(unix))]
    let _ = path;

    options
}

fn file_digest(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
