//! Orchestration of one snapshot run.
//!
//! The sequence is: preflight checks, open and rewind the filelist, parse
//! the prior snapshot, prepend and crawl every root, partition, classify,
//! drive the sink (removed, then modified, then added), truncate and
//! rewrite the filelist, and finally re-touch the timestamp anchor. The
//! held filelist descriptor is the commit point: nothing mutates it until
//! every stream has been emitted and no abort has been observed.

use crate::classify::{self, ChangeRule};
use crate::crawl::{self, CrawlError, CrawlPolicy, CrawlStatus};
use crate::diff;
use crate::entry;
use crate::filelist;
use crate::report::{Sink, StreamKind};
use crate::snapshot::Snapshot;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Longest accepted path argument, matching PATH_MAX where it matters.
const MAX_ARG_BYTES: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("refusing to run with mismatched real and effective user or group ids")]
    PrivilegeMismatch,
    #[error("argument longer than {MAX_ARG_BYTES} bytes: {0:?}")]
    ArgumentTooLong(PathBuf),
    #[error("could not determine the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("could not open filelist {path}: {source}")]
    OpenFilelist { path: PathBuf, source: io::Error },
    #[error("could not rewind filelist {path}: {source}")]
    RewindFilelist { path: PathBuf, source: io::Error },
    #[error("could not read filelist {path}: {source}")]
    ReadFilelist { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Crawl(#[from] CrawlError),
    #[error("could not write report: {0}")]
    Report(io::Error),
    #[error("could not rewrite filelist {path}: {source}")]
    RewriteFilelist { path: PathBuf, source: io::Error },
    #[error("could not touch timestamp anchor {path}: {source}")]
    TouchAnchor { path: PathBuf, source: io::Error },
}

/// Immutable run configuration, built once by the CLI layer.
#[derive(Debug)]
pub struct Config {
    pub filelist: PathBuf,
    pub roots: Vec<PathBuf>,
    /// Record terminator for the filelist, `\n` or NUL.
    pub delimiter: u8,
    /// Timestamp anchor for incremental runs.
    pub anchor: Option<PathBuf>,
    /// Classify against recorded metadata instead of a timestamp.
    pub local_compare: bool,
    pub crawl: CrawlPolicy,
}

/// Stream sizes of a completed run, counted before emission gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub removed: usize,
    pub modified: usize,
    pub added: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Totals),
    /// A signal stopped the run; the filelist was not rewritten.
    Aborted,
}

pub fn run(
    config: &Config,
    sink: &mut dyn Sink,
    abort: &AtomicBool,
) -> Result<RunOutcome, RunError> {
    refuse_privilege_mismatch()?;
    let cwd = std::env::current_dir().map_err(RunError::WorkingDirectory)?;

    check_argument(&config.filelist)?;
    for root in &config.roots {
        check_argument(root)?;
    }
    let roots: Vec<PathBuf> = config
        .roots
        .iter()
        .map(|root| entry::normalize(&cwd.join(root)))
        .collect();

    let rule = change_rule(config);

    let mut filelist = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&config.filelist)
        .map_err(|source| RunError::OpenFilelist {
            path: config.filelist.clone(),
            source,
        })?;
    filelist
        .seek(SeekFrom::Start(0))
        .map_err(|source| RunError::RewindFilelist {
            path: config.filelist.clone(),
            source,
        })?;

    let read = filelist::read_snapshot(BufReader::new(&filelist), config.delimiter, abort)
        .map_err(|source| RunError::ReadFilelist {
            path: config.filelist.clone(),
            source,
        })?;
    if read.interrupted {
        return Ok(RunOutcome::Aborted);
    }
    let prior = read.snapshot;
    debug!(
        "prior snapshot holds {} entries, {} corrupt records skipped",
        prior.len(),
        read.skipped
    );

    let mut current = Snapshot::new();
    for root in &roots {
        debug!("crawling {}", root.display());
        crawl::prepend(&mut current, root, &config.crawl)?;
        if crawl::crawl(&mut current, root, &config.crawl, abort) == CrawlStatus::Interrupted {
            return Ok(RunOutcome::Aborted);
        }
    }

    let parts = diff::partition(&prior, &current);
    let mut totals = Totals {
        removed: parts.removed.len(),
        modified: 0,
        added: parts.added.len(),
    };

    for entry in parts.removed.iter() {
        sink.emit(StreamKind::Removed, entry)
            .map_err(RunError::Report)?;
    }
    for entry in parts.candidates.iter() {
        if rule.is_modified(prior.get(entry.path_bytes()), entry) {
            totals.modified += 1;
            sink.emit(StreamKind::Modified, entry)
                .map_err(RunError::Report)?;
        }
    }
    for entry in parts.added.iter() {
        sink.emit(StreamKind::Added, entry)
            .map_err(RunError::Report)?;
    }
    sink.finish().map_err(RunError::Report)?;

    // A signal between the crawl and this point must still leave the
    // previous snapshot on disk.
    if abort.load(Ordering::Relaxed) {
        return Ok(RunOutcome::Aborted);
    }

    if !is_null_sink(&config.filelist) {
        rewrite(&mut filelist, &current, config.delimiter).map_err(|source| {
            RunError::RewriteFilelist {
                path: config.filelist.clone(),
                source,
            }
        })?;
    }

    if let Some(anchor) = &config.anchor {
        touch(anchor).map_err(|source| RunError::TouchAnchor {
            path: anchor.clone(),
            source,
        })?;
    }

    Ok(RunOutcome::Completed(totals))
}

fn change_rule(config: &Config) -> ChangeRule {
    if let Some(anchor) = &config.anchor {
        let threshold = classify::anchor_threshold(anchor);
        debug!(
            "incremental threshold {threshold} from {}",
            anchor.display()
        );
        ChangeRule::SinceAnchor { threshold }
    } else if config.local_compare {
        ChangeRule::RecordedMetadata
    } else {
        ChangeRule::Always
    }
}

fn rewrite(file: &mut File, current: &Snapshot, delimiter: u8) -> io::Result<()> {
    file.set_len(0)?;
    let writer = BufWriter::new(file);
    filelist::write_snapshot(writer, current, delimiter)
}

/// Re-create the anchor like `creat(2)` would, advancing its change time.
fn touch(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map(|_| ())
}

fn refuse_privilege_mismatch() -> Result<(), RunError> {
    use nix::unistd::{getegid, geteuid, getgid, getuid};

    if getuid() == geteuid() && getgid() == getegid() {
        Ok(())
    } else {
        Err(RunError::PrivilegeMismatch)
    }
}

fn check_argument(path: &Path) -> Result<(), RunError> {
    if path.as_os_str().len() > MAX_ARG_BYTES {
        return Err(RunError::ArgumentTooLong(path.to_path_buf()));
    }
    Ok(())
}

fn is_null_sink(path: &Path) -> bool {
    path == Path::new("/dev/null")
}
