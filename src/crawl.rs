//! Filesystem crawling: ancestor prepend and policy-driven descent.
//!
//! The crawler only synthesizes entries; ordering is the snapshot's job.
//! Directory entries are inserted before their children, so every entry's
//! ancestry is present by the time the snapshot is diffed. Per-entry stat
//! failures are diagnostics, not errors: the entry (and its subtree, for a
//! directory) is skipped and the crawl goes on.

use crate::entry::{Entry, EntryKind};
use crate::snapshot::Snapshot;
use globset::GlobMatcher;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Directories containing this marker file are listed but not descended,
/// unless marker handling is switched off.
const NOBACKUP_FILENAME: &str = ".nobackup";

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("could not stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },
}

/// Descent policy, built once by the CLI layer.
#[derive(Debug)]
pub struct CrawlPolicy {
    /// Do not cross device boundaries below a root.
    pub one_file_system: bool,
    /// When false, `.nobackup` markers are ignored.
    pub honor_nobackup: bool,
    /// Skip regular files larger than this.
    pub max_size: Option<u64>,
    /// Paths matching the pattern are skipped entirely: no entry, no descent.
    pub exclude: Option<GlobMatcher>,
    /// Record extended attribute names on each entry.
    pub capture_xattrs: bool,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        CrawlPolicy {
            one_file_system: false,
            honor_nobackup: true,
            max_size: None,
            exclude: None,
            capture_xattrs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Completed,
    Interrupted,
}

/// Insert entries for `/`, every directory on the way down to `root`, and
/// `root` itself, from live stat data. Overlapping roots insert the same
/// ancestors idempotently.
pub fn prepend(
    snapshot: &mut Snapshot,
    root: &Path,
    policy: &CrawlPolicy,
) -> Result<(), CrawlError> {
    let mut ancestors: Vec<&Path> = root.ancestors().collect();
    ancestors.reverse();

    for dir in ancestors {
        let entry = stat_entry(dir, policy).map_err(|source| CrawlError::Stat {
            path: dir.to_path_buf(),
            source,
        })?;
        insert_entry(snapshot, entry);
    }
    Ok(())
}

/// Depth-first descent from `root`, whose own entry is expected to be
/// present already (see [`prepend`]). A root that is not a directory has
/// nothing to descend into.
pub fn crawl(
    snapshot: &mut Snapshot,
    root: &Path,
    policy: &CrawlPolicy,
    abort: &AtomicBool,
) -> CrawlStatus {
    let root_dev = match fs::symlink_metadata(root) {
        Ok(meta) if meta.file_type().is_dir() => meta.dev(),
        Ok(_) => return CrawlStatus::Completed,
        Err(err) => {
            warn!("could not stat {}: {err}", root.display());
            return CrawlStatus::Completed;
        }
    };
    descend(snapshot, root, root_dev, policy, abort)
}

fn descend(
    snapshot: &mut Snapshot,
    dir: &Path,
    root_dev: u64,
    policy: &CrawlPolicy,
    abort: &AtomicBool,
) -> CrawlStatus {
    if abort.load(Ordering::Relaxed) {
        return CrawlStatus::Interrupted;
    }
    if policy.honor_nobackup && dir.join(NOBACKUP_FILENAME).symlink_metadata().is_ok() {
        debug!(
            "not descending into {}: {NOBACKUP_FILENAME} marker",
            dir.display()
        );
        return CrawlStatus::Completed;
    }

    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            warn!("could not read directory {}: {err}", dir.display());
            return CrawlStatus::Completed;
        }
    };

    for dirent in read_dir {
        if abort.load(Ordering::Relaxed) {
            return CrawlStatus::Interrupted;
        }
        let dirent = match dirent {
            Ok(dirent) => dirent,
            Err(err) => {
                warn!("could not read an entry of {}: {err}", dir.display());
                continue;
            }
        };
        let path = dirent.path();

        if let Some(matcher) = &policy.exclude
            && matcher.is_match(&path)
        {
            continue;
        }

        let entry = match stat_entry(&path, policy) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("could not stat {}: {err}", path.display());
                continue;
            }
        };

        if let Some(limit) = policy.max_size
            && entry.kind() == EntryKind::Regular
            && entry.size > limit
        {
            continue;
        }

        let is_dir = entry.is_dir();
        let entry_dev = entry.dev;
        insert_entry(snapshot, entry);

        if is_dir {
            if policy.one_file_system && entry_dev != root_dev {
                debug!("not crossing filesystem boundary at {}", path.display());
                continue;
            }
            if descend(snapshot, &path, root_dev, policy, abort) == CrawlStatus::Interrupted {
                return CrawlStatus::Interrupted;
            }
        }
    }
    CrawlStatus::Completed
}

fn stat_entry(path: &Path, policy: &CrawlPolicy) -> io::Result<Entry> {
    let meta = fs::symlink_metadata(path)?;
    let link_target = if meta.file_type().is_symlink() {
        Some(fs::read_link(path)?)
    } else {
        None
    };

    let mut entry = Entry::from_metadata(path.to_path_buf(), &meta, link_target);
    if policy.capture_xattrs && !meta.file_type().is_symlink() {
        entry.xattrs = xattr_names(path);
    }
    Ok(entry)
}

fn xattr_names(path: &Path) -> Vec<OsString> {
    match xattr::list(path) {
        Ok(names) => names.collect(),
        Err(err) => {
            debug!(
                "could not list extended attributes of {}: {err}",
                path.display()
            );
            Vec::new()
        }
    }
}

fn insert_entry(snapshot: &mut Snapshot, entry: Entry) {
    if let Some(previous) = snapshot.get(entry.path_bytes())
        && previous != &entry
    {
        warn!(
            "overlapping roots disagree on {}; keeping the latest stat",
            entry.path.display()
        );
    }
    snapshot.insert(entry);
}
