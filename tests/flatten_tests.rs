//! Integration tests for the flattening library API.
//!
//! These tests verify the guarantees a run gives on a real filesystem:
//! no content is lost, nothing is overwritten, a second run is a no-op,
//! and reports describe exactly what happened.

use dedupe_flatten::error::ExitCode;
use dedupe_flatten::flatten::{FlattenConfig, FlattenError, Flattener, Outcome};
use dedupe_flatten::output::{CsvOutput, JsonOutput, TextOutput};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Every file under `root` keyed by relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn visit(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    visit(root, root, &mut out);
    out
}

/// Sorted contents of every file under `root`.
fn contents(root: &Path) -> Vec<Vec<u8>> {
    let mut all: Vec<Vec<u8>> = snapshot(root).into_values().collect();
    all.sort();
    all
}

fn sample_tree(root: &Path) {
    write(root, "top.txt", b"top");
    write(root, "docs/report.pdf", b"%PDF report");
    write(root, "docs/old/report.pdf", b"%PDF report");
    write(root, "docs/old/report_v2.pdf", b"%PDF report v2");
    write(root, "music/a/song.mp3", b"ID3 song");
    write(root, "music/b/song.mp3", b"ID3 other song");
    write(root, "music/c/song.mp3", b"ID3 song");
    write(root, "misc/top.txt", b"top");
    fs::create_dir_all(root.join("empty/nested")).unwrap();
}

// =============================================================================
// Guarantees
// =============================================================================

#[test]
fn test_no_content_lost() {
    let dir = TempDir::new().unwrap();
    sample_tree(dir.path());
    let before = contents(dir.path());

    let report = Flattener::new(FlattenConfig::default())
        .run(dir.path())
        .unwrap();

    assert_eq!(contents(dir.path()), before);
    assert_eq!(report.files.len(), before.len());
    assert!(!report.has_failures());
}

#[test]
fn test_result_is_flat() {
    let dir = TempDir::new().unwrap();
    sample_tree(dir.path());

    Flattener::new(FlattenConfig::default())
        .run(dir.path())
        .unwrap();

    for rel in snapshot(dir.path()).keys() {
        let parent = rel.parent().unwrap();
        assert!(
            parent == Path::new("") || parent == Path::new("_duplicates"),
            "{} is not flat",
            rel.display()
        );
    }
}

#[test]
fn test_kept_files_have_distinct_content() {
    let dir = TempDir::new().unwrap();
    sample_tree(dir.path());

    Flattener::new(FlattenConfig::default())
        .run(dir.path())
        .unwrap();

    let kept: Vec<Vec<u8>> = snapshot(dir.path())
        .into_iter()
        .filter(|(rel, _)| rel.parent() == Some(Path::new("")))
        .map(|(_, content)| content)
        .collect();
    let mut unique = kept.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(kept.len(), unique.len());
    assert_eq!(kept.len(), 5);
}

#[test]
fn test_second_run_changes_nothing() {
    let dir = TempDir::new().unwrap();
    sample_tree(dir.path());

    let flattener = Flattener::new(FlattenConfig::default());
    flattener.run(dir.path()).unwrap();
    let after_first = snapshot(dir.path());

    let report = flattener.run(dir.path()).unwrap();
    let summary = report.summary();

    assert_eq!(snapshot(dir.path()), after_first);
    assert_eq!(summary.moved, 0);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.pruned, 0);
    assert_eq!(summary.in_place, summary.files);
}

#[test]
fn test_existing_root_file_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "name.txt", b"root version");
    write(root, "sub/name.txt", b"nested version");

    let report = Flattener::new(FlattenConfig::default()).run(root).unwrap();

    assert_eq!(fs::read(root.join("name.txt")).unwrap(), b"root version");
    assert_eq!(fs::read(root.join("name_1.txt")).unwrap(), b"nested version");
    assert_eq!(report.summary().renamed, 1);
}

#[test]
fn test_numbered_names_skip_taken_candidates() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "n.txt", b"0");
    write(root, "n_1.txt", b"1");
    write(root, "sub/n.txt", b"2");

    Flattener::new(FlattenConfig::default()).run(root).unwrap();

    assert_eq!(fs::read(root.join("n_2.txt")).unwrap(), b"2");
}

#[test]
fn test_unicode_and_extensionless_names() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "Makefile", b"all:");
    write(root, "src/Makefile", b"build:");
    write(root, "фото/снимок.jpg", b"jpeg");
    write(root, "a/.env", b"KEY=1");
    write(root, "b/.env", b"KEY=2");

    Flattener::new(FlattenConfig::default()).run(root).unwrap();

    assert_eq!(fs::read(root.join("Makefile_1")).unwrap(), b"build:");
    assert_eq!(fs::read(root.join("снимок.jpg")).unwrap(), b"jpeg");
    assert_eq!(fs::read(root.join(".env")).unwrap(), b"KEY=1");
    assert_eq!(fs::read(root.join(".env_1")).unwrap(), b"KEY=2");
}

#[test]
fn test_rename_attempts_bound_reports_failure() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "f.txt", b"0");
    write(root, "f_1.txt", b"1");
    write(root, "f_2.txt", b"2");
    write(root, "sub/f.txt", b"3");

    let config = FlattenConfig::default().with_max_rename_attempts(2);
    let report = Flattener::new(config).run(root).unwrap();

    let failed = report
        .files
        .iter()
        .find(|f| f.source.ends_with("sub/f.txt"))
        .unwrap();
    assert_eq!(failed.error().map(|e| e.kind()), Some("name-exhausted"));
    assert!(root.join("sub/f.txt").exists());
    assert!(root.join("sub").exists());
    assert_eq!(ExitCode::from_report(&report), ExitCode::PartialSuccess);
}

// =============================================================================
// Errors and interruption
// =============================================================================

#[test]
fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let result = Flattener::new(FlattenConfig::default()).run(&dir.path().join("missing"));
    assert!(matches!(result, Err(FlattenError::PathNotFound(_))));
}

#[test]
fn test_file_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "file.txt", b"x");
    let result = Flattener::new(FlattenConfig::default()).run(&dir.path().join("file.txt"));
    assert!(matches!(result, Err(FlattenError::NotADirectory(_))));
}

#[test]
fn test_shutdown_before_run_leaves_tree_untouched() {
    let dir = TempDir::new().unwrap();
    sample_tree(dir.path());
    let before = snapshot(dir.path());

    let config = FlattenConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let report = Flattener::new(config).run(dir.path()).unwrap();

    assert!(report.interrupted);
    assert!(report.files.is_empty());
    assert_eq!(snapshot(dir.path()), before);
    assert!(dir.path().join("empty/nested").exists());
    assert_eq!(ExitCode::from_report(&report), ExitCode::Interrupted);
}

#[cfg(unix)]
#[test]
fn test_symlinks_left_in_place_by_default() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "data/real.txt", b"real");
    std::os::unix::fs::symlink(root.join("data/real.txt"), root.join("data/link.txt")).unwrap();

    let report = Flattener::new(FlattenConfig::default()).run(root).unwrap();

    assert_eq!(report.files.len(), 1);
    assert!(root.join("real.txt").exists());
    assert!(fs::symlink_metadata(root.join("data/link.txt"))
        .unwrap()
        .file_type()
        .is_symlink());
    assert!(root.join("data").exists());
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_stop_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a/secret.bin", b"secret");
    write(root, "a/x.txt", b"same");
    write(root, "b/x.txt", b"same");
    write(root, "c/y.txt", b"other");

    let secret = root.join("a/secret.bin");
    set_mode(&secret, 0o000);
    if fs::File::open(&secret).is_ok() {
        // Permission bits do not bind a privileged user
        set_mode(&secret, 0o644);
        return;
    }

    let report = Flattener::new(FlattenConfig::default()).run(root).unwrap();
    set_mode(&secret, 0o644);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, "read");
    assert!(failures[0].path.ends_with("a/secret.bin"));

    let summary = report.summary();
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(fs::read(root.join("x.txt")).unwrap(), b"same");
    assert_eq!(fs::read(root.join("y.txt")).unwrap(), b"other");
    assert_eq!(fs::read(root.join("_duplicates/x.txt")).unwrap(), b"same");

    // The folder still holding the unreadable file is not pruned
    assert!(secret.exists());
    assert!(!root.join("b").exists());
    assert!(!root.join("c").exists());
    assert_eq!(ExitCode::from_report(&report), ExitCode::PartialSuccess);
}

#[cfg(unix)]
#[test]
fn test_directory_removal_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a/f.txt", b"f");
    let locked = root.join("locked");
    fs::create_dir_all(locked.join("empty")).unwrap();

    set_mode(&locked, 0o555);
    let canary = locked.join("canary");
    if fs::create_dir(&canary).is_ok() {
        // Permission bits do not bind a privileged user
        fs::remove_dir(&canary).unwrap();
        set_mode(&locked, 0o755);
        return;
    }

    let report = Flattener::new(FlattenConfig::default()).run(root).unwrap();
    set_mode(&locked, 0o755);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, "dir-remove");
    assert!(failures[0].path.ends_with("locked/empty"));

    // The rest of the run went ahead
    assert_eq!(fs::read(root.join("f.txt")).unwrap(), b"f");
    assert!(!root.join("a").exists());
    assert!(locked.join("empty").exists());
    assert_eq!(report.summary().failed, 1);
    assert_eq!(ExitCode::from_report(&report), ExitCode::PartialSuccess);
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_reports_from_real_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a/same.txt", b"same");
    write(root, "b/same.txt", b"same");

    let report = Flattener::new(FlattenConfig::default()).run(root).unwrap();
    let exit_code = ExitCode::from_report(&report);
    assert_eq!(exit_code, ExitCode::Success);

    let json = JsonOutput::new(&report, exit_code).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["kept"], 1);
    assert_eq!(value["summary"]["duplicates"], 1);
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["files"].as_array().unwrap().len(), 2);
    assert_eq!(value["files"][1]["outcome"], "duplicate");

    let csv = CsvOutput::new(&report).to_string().unwrap();
    assert_eq!(csv.lines().count(), 3);

    let text = TextOutput::new(&report, false).render();
    assert!(text.contains("Duplicates      1"));

    let duplicate = &report.files[1];
    match &duplicate.outcome {
        Outcome::Duplicate {
            destination,
            original,
        } => {
            assert_eq!(destination, &report.root.join("_duplicates").join("same.txt"));
            assert_eq!(original, &report.root.join("same.txt"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_report_file_written() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("tree");
    write(&root, "a/x.txt", b"x");

    let report = Flattener::new(FlattenConfig::default()).run(&root).unwrap();
    let report_path = dir.path().join("report.json");
    JsonOutput::new(&report, ExitCode::from_report(&report))
        .write_to_file(&report_path)
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(value["summary"]["moved"], 1);
    assert_eq!(value["pruned"].as_array().unwrap().len(), 1);
}
