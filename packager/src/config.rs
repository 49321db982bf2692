//! Pipeline configuration.
//!
//! Every location the pipeline touches is carried explicitly in
//! [`PipelineConfig`] so a run can be pointed at a scratch directory tree.
//! [`PipelineConfig::for_repository`] fills in the conventional repository
//! layout.

use crate::platform::{Platform, RequiredArtifacts};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

/// Output directory relative to the repository root.
pub const RELEASES_DIR: &str = "releases";
/// Auxiliary scripts directory relative to the repository root.
pub const SCRIPTS_DIR: &str = "zcutil";
/// Metadata generator relative to the repository root.
pub const GENBUILD_SCRIPT: &str = "share/genbuild.sh";
/// Signing script relative to the repository root.
pub const SIGNING_SCRIPT: &str = "contrib/sign-release.sh";

/// Product names used when naming release files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductNames {
    /// Prefix of archive names, e.g. `komodo` in `komodo-1.2.3-linux.tar.gz`.
    pub archive: String,
    /// Prefix of the macOS disk image, e.g. `KomodoOcean` in
    /// `KomodoOcean-1.2.3.dmg`.
    pub disk_image: String,
}

impl Default for ProductNames {
    fn default() -> Self {
        Self {
            archive: "komodo".to_owned(),
            disk_image: "KomodoOcean".to_owned(),
        }
    }
}

/// Complete configuration for a release run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Repository root; working directory of the metadata generator.
    pub repo_root: Utf8PathBuf,
    /// Release output directory holding the per-platform inputs and
    /// receiving archives.
    pub output_root: Utf8PathBuf,
    /// Parent for temporary staging directories; `None` uses the system
    /// temporary directory.
    pub staging_root: Option<Utf8PathBuf>,
    /// Binaries that must exist before packaging starts.
    pub required: RequiredArtifacts,
    /// Directory holding the auxiliary bootstrap scripts.
    pub scripts_dir: Utf8PathBuf,
    /// Build-metadata generator script.
    pub metadata_generator: Utf8PathBuf,
    /// Signing script copied into the output directory and run there.
    pub signing_script: Utf8PathBuf,
    /// Platforms to package, in order.
    pub platforms: Vec<Platform>,
    /// Naming prefixes for archives and the disk image.
    pub products: ProductNames,
    /// Upper bound on each subprocess; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Configuration for the conventional layout under `repo_root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use komodo_packager::config::PipelineConfig;
    /// use komodo_packager::platform::Platform;
    ///
    /// let config = PipelineConfig::for_repository(Utf8Path::new("/src/komodo"));
    /// assert_eq!(config.output_root, "/src/komodo/releases");
    /// assert_eq!(config.platforms, [Platform::Focal, Platform::Windows]);
    /// ```
    #[must_use]
    pub fn for_repository(repo_root: &Utf8Path) -> Self {
        Self {
            repo_root: repo_root.to_owned(),
            output_root: repo_root.join(RELEASES_DIR),
            staging_root: None,
            required: RequiredArtifacts::default(),
            scripts_dir: repo_root.join(SCRIPTS_DIR),
            metadata_generator: repo_root.join(GENBUILD_SCRIPT),
            signing_script: repo_root.join(SIGNING_SCRIPT),
            platforms: Platform::DEFAULT_PACKAGED.to_vec(),
            products: ProductNames::default(),
            command_timeout: None,
        }
    }

    /// Replace the output directory.
    #[must_use]
    pub fn with_output_root(mut self, output_root: Utf8PathBuf) -> Self {
        self.output_root = output_root;
        self
    }

    /// Replace the platform selection, dropping repeated entries.
    #[must_use]
    pub fn with_platforms(mut self, platforms: &[Platform]) -> Self {
        let mut selected = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !selected.contains(platform) {
                selected.push(*platform);
            }
        }
        self.platforms = selected;
        self
    }

    /// Directory holding a platform's prebuilt artefacts.
    #[must_use]
    pub fn platform_dir(&self, platform: Platform) -> Utf8PathBuf {
        self.output_root.join(platform.dir_name())
    }
}
