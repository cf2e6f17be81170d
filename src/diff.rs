//! Three-way snapshot partition.

use crate::snapshot::{Snapshot, SnapshotView};

/// The difference between a prior and a current snapshot, as borrowed views.
/// `removed` borrows from `prior`, the other two from `current`.
pub struct Partition<'a> {
    /// Recorded previously, no longer on disk.
    pub removed: SnapshotView<'a>,
    /// On disk, not recorded previously.
    pub added: SnapshotView<'a>,
    /// Present on both sides; input to the change classifier.
    pub candidates: SnapshotView<'a>,
}

pub fn partition<'a>(prior: &'a Snapshot, current: &'a Snapshot) -> Partition<'a> {
    let removed = prior.subtract(current);
    let added = current.subtract(prior);
    // The extra subtraction drops directory paths that end up on both the
    // current and the removed side when a subtree was partially deleted and
    // crawl ancestry re-created the directory entry.
    let candidates = current.subtract(&added).subtract(&removed);

    Partition {
        removed,
        added,
        candidates,
    }
}
