//! Release directory listing.

use crate::error::Result;
use camino::Utf8Path;
use std::fs;

/// Names of the immediate subdirectories of `output_root`, sorted.
///
/// Symlinks to directories count as directories. A missing `output_root`
/// yields an empty list.
///
/// # Errors
///
/// Returns [`crate::error::PackagerError::Io`] if the directory exists but
/// cannot be read.
pub fn scan_releases(output_root: &Utf8Path) -> Result<Vec<String>> {
    if !output_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in output_root.read_dir_utf8()? {
        let entry = entry?;
        if fs::metadata(entry.path()).is_ok_and(|meta| meta.is_dir()) {
            names.push(entry.file_name().to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// The one-line report printed before metadata generation.
#[must_use]
pub fn describe_releases(names: &[String]) -> String {
    if names.is_empty() {
        "No releases found in releases directory".to_owned()
    } else {
        format!("Found releases: {}", names.join(", "))
    }
}
