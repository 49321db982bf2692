//! Unit tests for per-platform staging.

use super::{RUNTIME_CONFIG, RUNTIME_CONFIG_FILE, StagingAssembler};
use crate::error::PackagerError;
use crate::fsutil::utf8_path;
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

/// A scratch tree with `releases/`, `zcutil/` and a staging parent.
struct Layout {
    _temp: TempDir,
    releases: Utf8PathBuf,
    scripts: Utf8PathBuf,
    staging: Utf8PathBuf,
}

impl Layout {
    fn platform_dir(&self, platform: Platform) -> Utf8PathBuf {
        let dir = self.releases.join(platform.dir_name());
        fs::create_dir_all(&dir).expect("mkdir platform");
        dir
    }

    fn write_scripts(&self, names: &[&str]) {
        for name in names {
            fs::write(self.scripts.join(name), "#!/bin/sh\n").expect("write script");
        }
    }

    fn assembler(&self) -> StagingAssembler<'_> {
        StagingAssembler::new(&self.scripts, Some(self.staging.as_path()))
    }

    fn staging_entries(&self) -> usize {
        fs::read_dir(&self.staging).expect("read staging").count()
    }
}

#[fixture]
fn layout() -> Layout {
    let temp = TempDir::new().expect("temp dir");
    let root = utf8_path(temp.path()).expect("utf-8");
    let releases = root.join("releases");
    let scripts = root.join("zcutil");
    let staging = root.join("staging");
    for dir in [&releases, &scripts, &staging] {
        fs::create_dir_all(dir).expect("mkdir");
    }
    Layout {
        _temp: temp,
        releases,
        scripts,
        staging,
    }
}

fn touch(dir: &Utf8Path, name: &str) {
    fs::write(dir.join(name), name.as_bytes()).expect("write file");
}

#[rstest]
fn focal_stages_files_config_and_scripts(layout: Layout) {
    let dir = layout.platform_dir(Platform::Focal);
    touch(&dir, "komodod");
    touch(&dir, "komodo-cli");
    fs::create_dir(dir.join("nested")).expect("mkdir nested");
    touch(&dir.join("nested"), "ignored");
    layout.write_scripts(&["fetch-params.sh", "fetch-params-alt.sh", "fetch-params.bat"]);
    let mut stderr = Vec::new();

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut stderr)
        .expect("staging succeeds");

    assert_eq!(
        area.files(),
        [
            "komodo-cli",
            "komodod",
            RUNTIME_CONFIG_FILE,
            "fetch-params.sh",
            "fetch-params-alt.sh",
        ]
    );
    assert!(!area.path().join("nested").exists());
    assert!(!area.path().join("fetch-params.bat").exists());
    let config = fs::read_to_string(area.path().join(RUNTIME_CONFIG_FILE)).expect("read config");
    assert_eq!(config, RUNTIME_CONFIG);
    assert!(
        area.path()
            .file_name()
            .is_some_and(|name| name.starts_with("komodo-release-focal-"))
    );
}

#[rstest]
fn windows_gets_batch_script_only(layout: Layout) {
    let dir = layout.platform_dir(Platform::Windows);
    touch(&dir, "komodod.exe");
    layout.write_scripts(&["fetch-params.sh", "fetch-params.bat"]);

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Windows, &mut Vec::new())
        .expect("staging succeeds");

    assert_eq!(
        area.files(),
        ["komodod.exe", RUNTIME_CONFIG_FILE, "fetch-params.bat"]
    );
}

#[rstest]
fn macos_leaves_disk_image_out(layout: Layout) {
    let dir = layout.platform_dir(Platform::Macos);
    touch(&dir, "KomodoOcean-1.0.dmg");
    touch(&dir, "KomodoOcean.zip");
    let mut stderr = Vec::new();

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Macos, &mut stderr)
        .expect("staging succeeds");

    assert!(area.files().iter().any(|f| f == "KomodoOcean.zip"));
    assert!(!area.path().join("KomodoOcean-1.0.dmg").exists());
    let output = String::from_utf8(stderr).expect("utf-8 output");
    assert!(output.contains("Skipped KomodoOcean-1.0.dmg (will be copied separately)"));
}

#[rstest]
fn missing_scripts_warn_and_continue(layout: Layout) {
    let dir = layout.platform_dir(Platform::Focal);
    touch(&dir, "komodod");
    layout.write_scripts(&["fetch-params.sh"]);
    let mut stderr = Vec::new();

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut stderr)
        .expect("missing scripts are not fatal");

    assert!(area.files().iter().any(|f| f == "fetch-params.sh"));
    assert!(!area.files().iter().any(|f| f == "fetch-params-alt.sh"));
    let output = String::from_utf8(stderr).expect("utf-8 output");
    assert!(output.contains("Warning: fetch-params-alt.sh not found"));
}

#[cfg(unix)]
#[rstest]
fn unix_scripts_are_executable(layout: Layout) {
    use std::os::unix::fs::PermissionsExt;

    let dir = layout.platform_dir(Platform::Focal);
    layout.write_scripts(&["fetch-params.sh", "fetch-params-alt.sh"]);

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut Vec::new())
        .expect("staging succeeds");

    for script in ["fetch-params.sh", "fetch-params-alt.sh"] {
        let mode = fs::metadata(area.path().join(script))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755, "{script}");
    }
}

#[rstest]
fn absent_platform_directory_is_reported(layout: Layout) {
    let missing = layout.releases.join("windows");

    let err = layout
        .assembler()
        .assemble(&missing, Platform::Windows, &mut Vec::new())
        .expect_err("directory is absent");

    assert!(matches!(
        err,
        PackagerError::PlatformDirectoryMissing { platform: Platform::Windows, .. }
    ));
    assert_eq!(layout.staging_entries(), 0);
}

#[rstest]
fn dropping_or_closing_removes_staging_directory(layout: Layout) {
    let dir = layout.platform_dir(Platform::Focal);
    touch(&dir, "komodod");

    let first = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut Vec::new())
        .expect("staging succeeds");
    let second = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut Vec::new())
        .expect("staging succeeds");
    assert_ne!(first.path(), second.path());
    assert_eq!(layout.staging_entries(), 2);

    drop(first);
    second.close().expect("close succeeds");
    assert_eq!(layout.staging_entries(), 0);
}

#[rstest]
fn missing_staging_parent_fails_staging(layout: Layout) {
    let dir = layout.platform_dir(Platform::Focal);
    let bogus = layout.staging.join("absent").join("deeper");

    let err = StagingAssembler::new(&layout.scripts, Some(bogus.as_path()))
        .assemble(&dir, Platform::Focal, &mut Vec::new())
        .expect_err("parent does not exist");

    assert!(matches!(
        err,
        PackagerError::StagingFailed { platform: Platform::Focal, .. }
    ));
}

#[rstest]
fn leftover_config_and_scripts_are_staged_once(layout: Layout) {
    let dir = layout.platform_dir(Platform::Focal);
    touch(&dir, "komodod");
    touch(&dir, RUNTIME_CONFIG_FILE);
    touch(&dir, "fetch-params.sh");
    layout.write_scripts(&["fetch-params.sh", "fetch-params-alt.sh"]);

    let area = layout
        .assembler()
        .assemble(&dir, Platform::Focal, &mut Vec::new())
        .expect("staging succeeds");

    assert_eq!(
        area.files(),
        [
            "fetch-params.sh",
            RUNTIME_CONFIG_FILE,
            "komodod",
            "fetch-params-alt.sh",
        ]
    );
    let config = fs::read_to_string(area.path().join(RUNTIME_CONFIG_FILE)).expect("read config");
    assert_eq!(config, RUNTIME_CONFIG);
    let script = fs::read_to_string(area.path().join("fetch-params.sh")).expect("read script");
    assert_eq!(script, "#!/bin/sh\n");
}
