//! Target platforms and their packaging rules.
//!
//! Each [`Platform`] carries the rules that differ between release flavours:
//! the artefact subdirectory name, the default required binaries, the
//! auxiliary bootstrap scripts bundled into its archive, the archive format,
//! and which source files are left out of staging.

use camino::Utf8Path;
use serde::Serialize;
use std::fmt;

/// A release platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Ubuntu 20.04 (focal) Linux binaries.
    Focal,
    /// Windows binaries.
    Windows,
    /// macOS Qt wallet.
    Macos,
}

/// Archive container used for a platform's release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tar (`.tar.gz`).
    TarGz,
    /// deflate-compressed zip (`.zip`).
    Zip,
}

/// An auxiliary bootstrap script copied into a platform's archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxScript {
    /// Filename inside the scripts directory and inside the archive.
    pub name: &'static str,
    /// Whether the staged copy gets executable permission bits.
    pub executable: bool,
}

/// Extension of disk-image files that are relocated rather than archived.
pub const DISK_IMAGE_EXTENSION: &str = "dmg";

const FOCAL_REQUIRED: &[&str] = &["wallet-utility", "komodod", "komodo-tx", "komodo-cli"];

const WINDOWS_REQUIRED: &[&str] = &[
    "wallet-utility.exe",
    "komodod.exe",
    "komodo-tx.exe",
    "komodo-cli.exe",
];

const UNIX_SCRIPTS: &[AuxScript] = &[
    AuxScript {
        name: "fetch-params.sh",
        executable: true,
    },
    AuxScript {
        name: "fetch-params-alt.sh",
        executable: true,
    },
];

const WINDOWS_SCRIPTS: &[AuxScript] = &[AuxScript {
    name: "fetch-params.bat",
    executable: false,
}];

impl Platform {
    /// Platforms packaged when none are selected explicitly, in order.
    pub const DEFAULT_PACKAGED: [Self; 2] = [Self::Focal, Self::Windows];

    /// Name of the platform's subdirectory under the output root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Focal => "focal",
            Self::Windows => "windows",
            Self::Macos => "macos",
        }
    }

    /// Binaries that must be present before packaging may proceed.
    ///
    /// macOS has no required set: its disk image is checked only when the
    /// platform is actually packaged.
    #[must_use]
    pub const fn default_required_files(self) -> &'static [&'static str] {
        match self {
            Self::Focal => FOCAL_REQUIRED,
            Self::Windows => WINDOWS_REQUIRED,
            Self::Macos => &[],
        }
    }

    /// Auxiliary scripts bundled into the platform's archive.
    #[must_use]
    pub const fn aux_scripts(self) -> &'static [AuxScript] {
        match self {
            Self::Focal | Self::Macos => UNIX_SCRIPTS,
            Self::Windows => WINDOWS_SCRIPTS,
        }
    }

    /// Archive container for the platform.
    #[must_use]
    pub const fn archive_format(self) -> ArchiveFormat {
        match self {
            Self::Focal => ArchiveFormat::TarGz,
            Self::Windows | Self::Macos => ArchiveFormat::Zip,
        }
    }

    /// Whether a source file is left out of the staging directory.
    #[must_use]
    pub fn excludes_from_staging(self, file: &Utf8Path) -> bool {
        matches!(self, Self::Macos) && file.extension() == Some(DISK_IMAGE_EXTENSION)
    }

    /// Whether the platform ships a disk image alongside its archive.
    #[must_use]
    pub const fn ships_disk_image(self) -> bool {
        matches!(self, Self::Macos)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// The ordered table of platforms and the binaries each must provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredArtifacts {
    entries: Vec<(Platform, Vec<String>)>,
}

impl RequiredArtifacts {
    /// Build a table from explicit entries, preserving their order.
    #[must_use]
    pub fn new(entries: Vec<(Platform, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Iterate over `(platform, required files)` in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &[String])> {
        self.entries
            .iter()
            .map(|(platform, files)| (*platform, files.as_slice()))
    }

    /// Platforms covered by the table, in declared order.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.entries.iter().map(|(platform, _)| *platform).collect()
    }
}

impl Default for RequiredArtifacts {
    /// The release set: focal then windows, each with its four binaries.
    fn default() -> Self {
        Self::new(
            Platform::DEFAULT_PACKAGED
                .iter()
                .map(|platform| {
                    let files = platform
                        .default_required_files()
                        .iter()
                        .map(|name| (*name).to_owned())
                        .collect();
                    (*platform, files)
                })
                .collect(),
        )
    }
}
