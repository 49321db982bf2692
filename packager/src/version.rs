//! Release version derived from the build descriptor.
//!
//! The metadata generator writes a descriptor such as `v0.9.1` or `0.9.1`;
//! archive names use the descriptor with the leading `v` marker removed.

use crate::error::{PackagerError, Result};
use serde::Serialize;
use std::fmt;

/// Marker prefixed to tagged build descriptors.
const TAG_MARKER: char = 'v';

/// A non-empty release version string.
///
/// # Examples
///
/// ```
/// use komodo_packager::version::Version;
///
/// let version = Version::resolve(Some("v0.9.1"))?;
/// assert_eq!(version.as_str(), "0.9.1");
/// # Ok::<(), komodo_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Derive the version from a build descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::MissingDescriptor`] when the descriptor is
    /// absent or empty, or consists only of the `v` marker.
    pub fn resolve(descriptor: Option<&str>) -> Result<Self> {
        let descriptor = descriptor
            .filter(|d| !d.is_empty())
            .ok_or(PackagerError::MissingDescriptor)?;
        let version = descriptor.strip_prefix(TAG_MARKER).unwrap_or(descriptor);
        if version.is_empty() {
            return Err(PackagerError::MissingDescriptor);
        }
        Ok(Self(version.to_owned()))
    }

    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
