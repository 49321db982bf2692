//! Release archive creation.
//!
//! Serializes a [`StagingArea`] into the platform's archive format under its
//! canonical name in the output directory. Entries are stored flat, under
//! their bare file names. For macOS the disk image is copied next to the
//! archive afterwards.

use crate::config::{PipelineConfig, ProductNames};
use crate::error::{PackagerError, Result};
use crate::output::write_stderr_line;
use crate::platform::{ArchiveFormat, DISK_IMAGE_EXTENSION, Platform};
use crate::stager::StagingArea;
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// The canonical file name of a platform's release archive.
///
/// The macOS name is fixed and never carries the version.
///
/// # Examples
///
/// ```
/// use komodo_packager::archive::ArchiveName;
/// use komodo_packager::config::ProductNames;
/// use komodo_packager::platform::Platform;
/// use komodo_packager::version::Version;
///
/// let version = Version::resolve(Some("v1.2.3"))?;
/// let products = ProductNames::default();
/// let name = ArchiveName::new(&products, Platform::Focal, &version);
/// assert_eq!(name.to_string(), "komodo-1.2.3-linux.tar.gz");
/// # Ok::<(), komodo_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    platform: Platform,
    product: String,
    version: Version,
}

impl ArchiveName {
    /// Name the archive of `platform` at `version`.
    #[must_use]
    pub fn new(products: &ProductNames, platform: Platform, version: &Version) -> Self {
        Self {
            platform,
            product: products.archive.clone(),
            version: version.clone(),
        }
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let product = &self.product;
        let version = &self.version;
        match self.platform {
            Platform::Focal => write!(f, "{product}-{version}-linux.tar.gz"),
            Platform::Windows => write!(f, "{product}-{version}-win.zip"),
            Platform::Macos => write!(f, "{product}-qt-mac.zip"),
        }
    }
}

/// File name of the macOS disk image for `version`.
#[must_use]
pub fn disk_image_name(products: &ProductNames, version: &Version) -> String {
    format!("{}-{version}.{DISK_IMAGE_EXTENSION}", products.disk_image)
}

/// A release archive written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseArchive {
    /// Platform the archive was built for.
    pub platform: Platform,
    /// Absolute path of the archive.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 digest of the archive file.
    pub sha256: String,
    /// Entry names, in the order they were written.
    pub entries: Vec<String>,
}

/// Everything a platform pass leaves in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedPlatform {
    /// The archive itself.
    pub archive: ReleaseArchive,
    /// The relocated disk image, for platforms that ship one.
    pub disk_image: Option<Utf8PathBuf>,
}

/// Writes archives into the output directory.
#[derive(Debug)]
pub struct ArchiveBuilder<'a> {
    output_root: &'a Utf8Path,
    products: &'a ProductNames,
}

impl<'a> ArchiveBuilder<'a> {
    /// Create a builder writing into `output_root`.
    #[must_use]
    pub const fn new(output_root: &'a Utf8Path, products: &'a ProductNames) -> Self {
        Self {
            output_root,
            products,
        }
    }

    /// Create a builder from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &'a PipelineConfig) -> Self {
        Self::new(&config.output_root, &config.products)
    }

    /// Archive `staging` and, for macOS, relocate the disk image found in
    /// `platform_dir`.
    ///
    /// An existing archive of the same name is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::DiskImageMissing`] when a macOS disk image is
    /// absent from `platform_dir`, and [`PackagerError::Io`] or
    /// [`PackagerError::Zip`] when writing fails.
    pub fn build(
        &self,
        staging: &StagingArea,
        version: &Version,
        platform_dir: &Utf8Path,
        stderr: &mut dyn Write,
    ) -> Result<PackagedPlatform> {
        let platform = staging.platform();
        let name = ArchiveName::new(self.products, platform, version).to_string();
        let path = self.output_root.join(&name);
        write_stderr_line(stderr, format!("  Creating archive: {name}"));

        let entries: Vec<(Utf8PathBuf, String)> = staging
            .files()
            .iter()
            .map(|file| (staging.path().join(file), file.clone()))
            .collect();
        match platform.archive_format() {
            ArchiveFormat::TarGz => create_tar_gz(&path, &entries)?,
            ArchiveFormat::Zip => create_zip(&path, &entries)?,
        }
        let sha256 = compute_sha256(&path)?;
        log::info!("created {path} ({} entries, sha256 {sha256})", entries.len());
        write_stderr_line(stderr, format!("  ✓ Created {path}"));

        let disk_image = if platform.ships_disk_image() {
            Some(self.relocate_disk_image(version, platform_dir, stderr)?)
        } else {
            None
        };

        Ok(PackagedPlatform {
            archive: ReleaseArchive {
                platform,
                path,
                sha256,
                entries: entries.into_iter().map(|(_, name)| name).collect(),
            },
            disk_image,
        })
    }

    fn relocate_disk_image(
        &self,
        version: &Version,
        platform_dir: &Utf8Path,
        stderr: &mut dyn Write,
    ) -> Result<Utf8PathBuf> {
        let name = disk_image_name(self.products, version);
        let source = platform_dir.join(&name);
        if !source.is_file() {
            return Err(PackagerError::DiskImageMissing { path: source });
        }
        let dest = self.output_root.join(&name);
        fs::copy(&source, &dest)?;
        write_stderr_line(stderr, format!("  Copied {name} to {}", self.output_root));
        Ok(dest)
    }
}

/// Create a gzip-compressed tar archive at `output_path`.
///
/// Each entry in `files` is a `(source_path, archive_name)` pair. Permission
/// bits are taken from the source file.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if a source cannot be read or the archive
/// cannot be written.
pub fn create_tar_gz(output_path: &Utf8Path, files: &[(Utf8PathBuf, String)]) -> Result<()> {
    let output_file = fs::File::create(output_path)?;
    let encoder = GzEncoder::new(output_file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    for (source_path, archive_name) in files {
        archive.append_path_with_name(source_path, archive_name)?;
    }

    archive.into_inner()?.finish()?;
    Ok(())
}

/// Create a deflate-compressed zip archive at `output_path`.
///
/// Each entry in `files` is a `(source_path, archive_name)` pair. On Unix the
/// source file's permission bits are recorded in the entry.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if a source cannot be read, or
/// [`PackagerError::Zip`] if the archive cannot be written.
pub fn create_zip(output_path: &Utf8Path, files: &[(Utf8PathBuf, String)]) -> Result<()> {
    let output_file = fs::File::create(output_path)?;
    let mut archive = zip::ZipWriter::new(output_file);
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (source_path, archive_name) in files {
        let options = match unix_mode(source_path)? {
            Some(mode) => base.unix_permissions(mode),
            None => base,
        };
        archive.start_file(archive_name.as_str(), options)?;
        let mut source = fs::File::open(source_path)?;
        io::copy(&mut source, &mut archive)?;
    }

    archive.finish()?;
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Utf8Path) -> Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;

    Ok(Some(fs::metadata(path)?.permissions().mode() & 0o777))
}

#[cfg(not(unix))]
fn unix_mode(_path: &Utf8Path) -> Result<Option<u32>> {
    Ok(None)
}

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
