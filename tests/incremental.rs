mod common;

use common::{lines_under, run, stdout_lines};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use tempfile::TempDir;

fn seed_record(filelist: &std::path::Path, mode: u32, ino: u64, path: &std::path::Path) {
    let record = format!(
        "{mode} 1 {ino} {} {}\n",
        path.as_os_str().as_bytes().len(),
        path.display()
    );
    let mut existing = fs::read_to_string(filelist).unwrap_or_default();
    existing.push_str(&record);
    fs::write(filelist, existing).unwrap();
}

/// A recorded path that no longer exists lands on the removed stream, and
/// the rewritten filelist drops it.
#[test]
fn vanished_entries_are_reported_removed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    let filelist = temp.path().join("list");
    let gone = root.join("gone");
    seed_record(&filelist, 33188, 7, &gone);

    let output = run(&filelist, &root, &[]);

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert!(lines.contains(&format!("R {}", gone.display())));
    assert!(lines.contains(&format!("A {}", root.display())));

    let written = fs::read_to_string(&filelist).unwrap();
    assert!(!written.contains("gone"));
    assert!(
        written
            .lines()
            .any(|line| line.ends_with(&format!(" {}", root.display())))
    );
}

/// With an anchor newer than every entry under the root, all three streams
/// stay quiet for that subtree.
#[test]
fn anchor_newer_than_the_tree_reports_nothing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"abc").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    let anchor = temp.path().join("stamp");
    fs::write(&anchor, b"").unwrap();

    let output = run(&filelist, &root, &["-N", anchor.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(lines_under(&output, &root).is_empty());
}

/// An entry whose change time moves past the anchor's lands on the
/// modified stream.
#[test]
fn change_after_the_anchor_is_reported_modified() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    let target = root.join("f");
    fs::write(&target, b"abc").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    let anchor = temp.path().join("stamp");
    fs::write(&anchor, b"").unwrap();

    // The change-time oracle has one-second resolution.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    fs::write(&target, b"abcd").unwrap();

    let output = run(&filelist, &root, &["-N", anchor.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(
        lines_under(&output, &root),
        vec![format!("M {}", target.display())]
    );
}

/// A missing anchor file means a full dump: every surviving entry counts
/// as modified. The anchor is created afterwards.
#[test]
fn missing_anchor_selects_a_full_dump() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"abc").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    let anchor = temp.path().join("fresh-stamp");
    let output = run(&filelist, &root, &["-N", anchor.to_str().unwrap()]);

    assert!(output.status.success());
    let lines = lines_under(&output, &root);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("M ")));
    assert!(anchor.exists());
}

/// The oracle compares inode change times, not modification times: a
/// backdated mtime cannot hide a change, because rewriting the timestamp
/// itself advances the ctime.
#[test]
fn backdated_mtime_does_not_hide_a_change() {
    use filetime::FileTime;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    let target = root.join("f");
    fs::write(&target, b"abc").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    let anchor = temp.path().join("stamp");
    fs::write(&anchor, b"").unwrap();

    std::thread::sleep(std::time::Duration::from_millis(1100));
    filetime::set_file_mtime(&target, FileTime::from_unix_time(1000, 0)).unwrap();

    let output = run(&filelist, &root, &["-N", anchor.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(
        lines_under(&output, &root),
        vec![format!("M {}", target.display())]
    );
}

/// The anchor is only re-touched after a successful run.
#[test]
fn failed_runs_leave_the_anchor_alone() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    let anchor = temp.path().join("stamp");

    // An unopenable filelist path is fatal before any crawling.
    let filelist = temp.path().join("no-such-dir/list");
    let output = run(&filelist, &root, &["-N", anchor.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(!anchor.exists());
}

/// Mode changes are picked up by the recorded-metadata rule without any
/// timestamp oracle.
#[test]
fn local_rule_reports_mode_changes() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("x");
    fs::create_dir(&root).unwrap();
    let target = root.join("f");
    fs::write(&target, b"abc").unwrap();
    fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();

    let output = run(&filelist, &root, &["-l"]);

    assert!(output.status.success());
    assert_eq!(
        lines_under(&output, &root),
        vec![format!("M {}", target.display())]
    );
}
