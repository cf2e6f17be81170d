use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::path::Path;
use std::process::Output;

pub fn snaplist_cmd() -> Command {
    cargo_bin_cmd!("snaplist")
}

pub fn run(filelist: &Path, root: &Path, extra: &[&str]) -> Output {
    let mut cmd = snaplist_cmd();
    cmd.args(extra).arg(filelist).arg(root);
    cmd.output().expect("failed to run snaplist")
}

// Each integration test file is compiled as its own crate; not every crate
// uses every helper.
#[allow(dead_code)]
pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8(output.stdout.clone())
        .expect("report output should be UTF-8 in these scenarios")
        .lines()
        .map(str::to_string)
        .collect()
}

/// Report lines that name paths under `root`, skipping the ancestor entries
/// the prepend step contributes (those are shared with the host system and
/// can be churned by unrelated processes).
#[allow(dead_code)]
pub fn lines_under(output: &Output, root: &Path) -> Vec<String> {
    let prefix = root.display().to_string();
    stdout_lines(output)
        .into_iter()
        .filter(|line| {
            line.split_once(' ')
                .is_some_and(|(_, path)| path.starts_with(&prefix))
        })
        .collect()
}
