//! Command-line interface schema for snaplist.
//!
//! Defines the clap struct for the single snapshot-diff command.
//! Long-form help text is sourced from `help_text`.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

mod help_text;

/// Incremental file list generator for backup pipelines
#[derive(Parser, Debug)]
#[command(
    name = "snaplist",
    version,
    about,
    long_about = help_text::ROOT_LONG_ABOUT
)]
pub struct Cli {
    /// Persisted file list from the previous run (created if absent)
    #[arg(value_name = "FILELIST")]
    pub filelist: PathBuf,

    /// Directory or directories to dump
    #[arg(value_name = "DIR", required = true)]
    pub roots: Vec<PathBuf>,

    /// Delimit filelist and report records with NUL instead of newline
    #[arg(short = '0', long = "null")]
    pub null_delimited: bool,

    /// Stay on the file system of each root
    #[arg(short = 'x', long = "one-file-system")]
    pub one_file_system: bool,

    /// Ignore .nobackup marker files
    #[arg(short = 'n', long = "no-nobackup")]
    pub no_nobackup: bool,

    /// Report removed entries only
    #[arg(short = 'R', long = "removed-only", conflicts_with = "modified_only")]
    pub removed_only: bool,

    /// Report modified entries only
    #[arg(short = 'm', long = "modified-only")]
    pub modified_only: bool,

    /// Skip regular files larger than SIZE bytes
    #[arg(short = 's', long = "max-size", value_name = "SIZE")]
    pub max_size: Option<u64>,

    /// Use FILE's change time as the incremental threshold; a missing FILE
    /// selects a full dump. FILE is re-created after a successful run.
    #[arg(
        short = 'N',
        long = "timestamp",
        value_name = "FILE",
        conflicts_with = "local"
    )]
    pub timestamp: Option<PathBuf>,

    /// Classify by comparing recorded metadata instead of a timestamp
    #[arg(short = 'l', long = "local")]
    pub local: bool,

    /// Skip paths matching this glob pattern entirely
    #[arg(short = 'E', long = "exclude", value_name = "PATTERN")]
    pub exclude: Option<String>,

    /// Capture extended attribute names for the %x placeholder
    #[arg(short = 'a', long = "xattrs")]
    pub xattrs: bool,

    /// Report template (see the long help for placeholders)
    #[arg(short = 'F', long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Increase verbosity (-v for info, -vv for debug).
    /// RUST_LOG overrides this.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positionals_and_flags() {
        let cli =
            Cli::try_parse_from(["snaplist", "-0", "-x", "-N", "/stamp", "list", "/a", "/b"])
                .unwrap();

        assert_eq!(cli.filelist, PathBuf::from("list"));
        assert_eq!(cli.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(cli.null_delimited);
        assert!(cli.one_file_system);
        assert_eq!(cli.timestamp, Some(PathBuf::from("/stamp")));
    }

    #[test]
    fn at_least_one_root_is_required() {
        assert!(Cli::try_parse_from(["snaplist", "list"]).is_err());
    }

    #[test]
    fn timestamp_and_local_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["snaplist", "-l", "-N", "/stamp", "list", "/a"]).is_err());
    }

    #[test]
    fn removed_only_and_modified_only_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["snaplist", "-R", "-m", "list", "/a"]).is_err());
    }
}
