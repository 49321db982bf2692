//! Required-artefact validation.
//!
//! Checks that every required binary is present for every required platform
//! before any packaging starts. Missing files are collected across all
//! platforms so the operator sees the whole gap in one report.

use crate::error::{MissingArtifact, PackagerError, Result};
use crate::output::write_stderr_line;
use crate::platform::{Platform, RequiredArtifacts};
use camino::Utf8Path;
use std::io::Write;

/// Presence of one required file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCheck {
    /// Platform the file belongs to.
    pub platform: Platform,
    /// Required filename.
    pub file: String,
    /// Whether the file exists as a regular file.
    pub present: bool,
}

/// Outcome of a successful validation, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Every file checked, platforms and files in declared order.
    pub checks: Vec<ArtifactCheck>,
}

/// Validates the per-platform artefact directories under `output_root`.
///
/// Prints a per-file presence line for each required file as it is checked.
///
/// # Errors
///
/// Returns [`PackagerError::PlatformDirectoryMissing`] as soon as a
/// platform's directory is absent, and [`PackagerError::MissingArtifacts`]
/// listing every absent file once all platforms have been scanned.
pub fn validate(
    output_root: &Utf8Path,
    required: &RequiredArtifacts,
    stderr: &mut dyn Write,
) -> Result<ValidationReport> {
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, "Validating release files...");

    let mut report = ValidationReport::default();
    for (platform, files) in required.iter() {
        let platform_dir = output_root.join(platform.dir_name());
        if !platform_dir.is_dir() {
            return Err(PackagerError::PlatformDirectoryMissing {
                platform,
                path: platform_dir,
            });
        }

        write_stderr_line(stderr, "");
        write_stderr_line(stderr, format!("Checking {platform} folder:"));
        for file in files {
            let present = platform_dir.join(file).is_file();
            if present {
                write_stderr_line(stderr, format!("  ✓ {file}"));
            } else {
                write_stderr_line(stderr, format!("  ✗ {file} - MISSING"));
            }
            report.checks.push(ArtifactCheck {
                platform,
                file: file.clone(),
                present,
            });
        }
    }

    let missing: Vec<MissingArtifact> = report
        .checks
        .iter()
        .filter(|check| !check.present)
        .map(|check| MissingArtifact {
            platform: check.platform,
            file: check.file.clone(),
        })
        .collect();

    if !missing.is_empty() {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, "Missing required files:");
        for artifact in &missing {
            write_stderr_line(stderr, format!("  - {artifact}"));
        }
        log::debug!("{} required file(s) missing", missing.len());
        return Err(PackagerError::MissingArtifacts { missing });
    }

    write_stderr_line(stderr, "");
    write_stderr_line(stderr, "✓ All required release files are present");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsutil::utf8_path;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn releases() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_path(temp.path()).expect("utf-8");
        (temp, root)
    }

    fn populate(root: &Utf8Path, platform: Platform, files: &[&str]) {
        let dir = root.join(platform.dir_name());
        fs::create_dir_all(&dir).expect("mkdir platform");
        for file in files {
            fs::write(dir.join(file), b"binary").expect("write binary");
        }
    }

    fn populate_complete(root: &Utf8Path) {
        for platform in Platform::DEFAULT_PACKAGED {
            populate(root, platform, platform.default_required_files());
        }
    }

    #[rstest]
    fn complete_tree_passes_and_reports_in_order(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate_complete(&root);
        let mut stderr = Vec::new();

        let report =
            validate(&root, &RequiredArtifacts::default(), &mut stderr).expect("validation passes");

        assert_eq!(report.checks.len(), 8);
        assert!(report.checks.iter().all(|c| c.present));

        let output = String::from_utf8(stderr).expect("utf-8 output");
        let expected_order = [
            "Checking focal folder:",
            "✓ wallet-utility",
            "✓ komodod",
            "✓ komodo-tx",
            "✓ komodo-cli",
            "Checking windows folder:",
            "✓ wallet-utility.exe",
            "✓ komodod.exe",
            "✓ komodo-tx.exe",
            "✓ komodo-cli.exe",
            "All required release files are present",
        ];
        let mut cursor = 0;
        for needle in expected_order {
            let found = output
                .get(cursor..)
                .and_then(|rest| rest.find(needle))
                .unwrap_or_else(|| panic!("missing or out of order: {needle}\n{output}"));
            cursor += found + needle.len();
        }
    }

    #[rstest]
    fn one_missing_focal_file_is_the_only_reported_gap(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate(&root, Platform::Focal, &["wallet-utility", "komodod", "komodo-tx"]);
        populate(
            &root,
            Platform::Windows,
            Platform::Windows.default_required_files(),
        );
        let mut stderr = Vec::new();

        let err = validate(&root, &RequiredArtifacts::default(), &mut stderr)
            .expect_err("validation must fail");

        match err {
            PackagerError::MissingArtifacts { missing } => {
                assert_eq!(
                    missing,
                    vec![MissingArtifact {
                        platform: Platform::Focal,
                        file: "komodo-cli".to_owned(),
                    }]
                );
            }
            other => panic!("expected MissingArtifacts, got {other:?}"),
        }
        let output = String::from_utf8(stderr).expect("utf-8 output");
        assert!(output.contains("✗ komodo-cli - MISSING"));
        assert!(output.contains("  - focal/komodo-cli"));
    }

    #[rstest]
    fn gaps_are_accumulated_across_platforms(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate(&root, Platform::Focal, &["komodod"]);
        populate(&root, Platform::Windows, &["komodod.exe", "komodo-cli.exe"]);

        let err = validate(&root, &RequiredArtifacts::default(), &mut Vec::new())
            .expect_err("validation must fail");

        let PackagerError::MissingArtifacts { missing } = err else {
            panic!("expected MissingArtifacts, got {err:?}");
        };
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            [
                "focal/wallet-utility",
                "focal/komodo-tx",
                "focal/komodo-cli",
                "windows/wallet-utility.exe",
                "windows/komodo-tx.exe",
            ]
        );
    }

    #[rstest]
    fn absent_platform_directory_is_fatal(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate(&root, Platform::Focal, Platform::Focal.default_required_files());

        let err = validate(&root, &RequiredArtifacts::default(), &mut Vec::new())
            .expect_err("windows directory is missing");

        assert!(matches!(
            err,
            PackagerError::PlatformDirectoryMissing { platform: Platform::Windows, .. }
        ));
    }

    #[rstest]
    fn directory_named_like_a_binary_does_not_count(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate_complete(&root);
        let binary = root.join("focal").join("komodod");
        fs::remove_file(&binary).expect("remove binary");
        fs::create_dir(&binary).expect("mkdir in its place");

        let err = validate(&root, &RequiredArtifacts::default(), &mut Vec::new())
            .expect_err("directory is not a binary");

        assert!(matches!(err, PackagerError::MissingArtifacts { ref missing } if missing.len() == 1));
    }

    #[rstest]
    fn custom_table_is_honoured(releases: (TempDir, Utf8PathBuf)) {
        let (_temp, root) = releases;
        populate(&root, Platform::Macos, &["KomodoOcean-1.0.dmg"]);
        let required = RequiredArtifacts::new(vec![(
            Platform::Macos,
            vec!["KomodoOcean-1.0.dmg".to_owned()],
        )]);

        let report = validate(&root, &required, &mut Vec::new()).expect("validation passes");
        assert_eq!(report.checks.len(), 1);
    }
}
