//! Build context archiving.
//!
//! The engine expects an image build context as a tar stream whose entry
//! names are relative, forward-slash paths, regardless of the host's path
//! separator.

use crate::container::{ContainerError, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Archive every regular file below `dir` into an uncompressed tar.
///
/// Directories are traversed but not recorded as entries, symlinks are
/// skipped, and entries are written in file-name order so the same tree
/// always produces the same archive.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or a file cannot be
/// read.
pub fn build_context(dir: &Path) -> Result<Vec<u8>> {
    let mut archive = tar::Builder::new(Vec::new());
    let mut files = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ContainerError::BuildError(format!(
                "failed to read build context {}: {}",
                dir.display(),
                e
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|_| {
            ContainerError::BuildError(format!(
                "{} is outside the build context",
                entry.path().display()
            ))
        })?;
        let name = archive_name(relative);

        let file = File::open(entry.path()).map_err(|e| {
            ContainerError::BuildError(format!("failed to open {}: {}", entry.path().display(), e))
        })?;
        let metadata = file.metadata()?;

        let mut header = tar::Header::new_gnu();
        header.set_size(metadata.len());
        header.set_mode(file_mode(&metadata));

        archive
            .append_data(&mut header, &name, file)
            .map_err(|e| {
                ContainerError::BuildError(format!("failed to write tar entry for {}: {}", name, e))
            })?;
        files += 1;
    }

    let bytes = archive.into_inner()?;
    debug!(
        "Archived {} files ({} bytes) from {}",
        files,
        bytes.len(),
        dir.display()
    );
    Ok(bytes)
}

/// Join path components with `/`.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}
