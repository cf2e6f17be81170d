mod common;

use common::{lines_under, run, stdout_lines};
use std::fs;
use tempfile::TempDir;

/// An absent filelist means an empty prior snapshot: everything is new, and
/// the filelist is created with one extended-grammar record per entry.
#[test]
fn first_run_reports_everything_as_new() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"abc").unwrap();
    let filelist = temp.path().join("list");

    let output = run(&filelist, &root, &[]);

    assert!(output.status.success());
    assert!(stdout_lines(&output).iter().all(|l| l.starts_with("A ")));
    assert_eq!(
        lines_under(&output, &root),
        vec![
            format!("A {}", root.display()),
            format!("A {}", root.join("f").display()),
        ]
    );
}

#[test]
fn ancestors_of_the_root_are_listed_first() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    let filelist = temp.path().join("list");

    let output = run(&filelist, &root, &[]);

    let lines = stdout_lines(&output);
    assert_eq!(lines.first().map(String::as_str), Some("A /"));
    let root_line = format!("A {}", root.display());
    assert!(lines.contains(&root_line));
}

#[test]
fn filelist_records_follow_the_extended_grammar() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"xyz").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);

    let written = fs::read_to_string(&filelist).unwrap();
    assert!(!written.is_empty());
    for line in written.lines() {
        let mut fields = line.splitn(5, ' ');
        let mode: u32 = fields.next().unwrap().parse().unwrap();
        let dev: u64 = fields.next().unwrap().parse().unwrap();
        let ino: u64 = fields.next().unwrap().parse().unwrap();
        let path_len: usize = fields.next().unwrap().parse().unwrap();
        let path = fields.next().unwrap();

        assert!(mode != 0);
        assert!(dev != 0);
        assert!(ino != 0);
        assert_eq!(path_len, path.len(), "bad path_len in {line:?}");
    }
    assert!(
        written
            .lines()
            .any(|line| line.ends_with(&format!(" {}", root.join("f").display())))
    );
}

#[test]
fn rerunning_without_changes_adds_nothing() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"abc").unwrap();
    let filelist = temp.path().join("list");

    run(&filelist, &root, &[]);
    let second = run(&filelist, &root, &[]);

    assert!(second.status.success());
    // Without an oracle every surviving entry is reported modified, but
    // nothing is new or removed.
    let lines = lines_under(&second, &root);
    assert!(!lines.is_empty());
    assert!(lines.iter().all(|l| l.starts_with("M ")));
}

#[test]
fn overlapping_roots_produce_no_duplicate_records() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("f"), b"abc").unwrap();
    let filelist = temp.path().join("list");

    let mut cmd = common::snaplist_cmd();
    cmd.arg(&filelist).arg(&root).arg(&root).arg(temp.path());
    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let written = fs::read_to_string(&filelist).unwrap();
    let mut paths: Vec<&str> = written
        .lines()
        .map(|line| line.splitn(5, ' ').nth(4).unwrap())
        .collect();
    let total = paths.len();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(paths.len(), total);
}
