//! Small filesystem helpers shared by the staging and signing steps.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;

/// Unix mode applied to scripts that must be runnable (rwxr-xr-x).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Marks a file as executable.
///
/// A no-op on platforms without Unix permission bits.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the permissions cannot be read or set.
#[cfg(unix)]
pub fn make_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(EXECUTABLE_MODE);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

/// Marks a file as executable.
///
/// A no-op on platforms without Unix permission bits.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn make_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}

/// Converts a standard path into a UTF-8 path.
///
/// # Errors
///
/// Returns [`PackagerError::NonUtf8Path`] when the path is not valid UTF-8.
pub fn utf8_path(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path.to_path_buf()).map_err(|err| PackagerError::NonUtf8Path {
        path: err.into_path_buf(),
    })
}
