use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::cache::HandleCache;
use crate::models::{Entry, EntryKind, is_direct_child};

/// What one batch merge did to the entry list.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    pub appended: usize,
    pub duplicates: usize,
}

/// Folds one adapter batch into the canonical entry list.
///
/// Unseen paths are appended and their content refs registered in `cache`;
/// paths already present keep their original entry untouched. Duplicates
/// inside the batch itself collapse the same way, so the list stays
/// pairwise-unique by path and overlapping expansions are idempotent.
pub fn merge_batch(
    entries: &mut Vec<Entry>,
    cache: &mut HandleCache,
    batch: Vec<Entry>,
) -> MergeStats {
    let mut seen: HashSet<String> = entries.iter().map(|e| e.path.clone()).collect();
    let mut stats = MergeStats::default();
    let mut fresh = Vec::with_capacity(batch.len());

    for entry in batch {
        if !seen.insert(entry.path.clone()) {
            stats.duplicates += 1;
            continue;
        }
        cache.insert_if_absent(&entry.path, entry.content_ref.clone());
        fresh.push(entry);
    }

    stats.appended = fresh.len();
    entries.extend(fresh);

    if stats.appended > 0 || stats.duplicates > 0 {
        debug!(
            appended = stats.appended,
            duplicates = stats.duplicates,
            "merged entry batch"
        );
    }
    stats
}

/// Direct children of `parent` in presentation order: directories before
/// files, names compared bytewise within each group. Derived on every call;
/// the stored list keeps arrival order.
pub fn children_of<'a>(entries: &'a [Entry], parent: &str) -> Vec<&'a Entry> {
    let mut children: Vec<&Entry> = entries
        .iter()
        .filter(|entry| is_direct_child(parent, &entry.path))
        .collect();
    children.sort_by(|a, b| sibling_order(a, b));
    children
}

/// Children of the source root.
pub fn root_entries(entries: &[Entry]) -> Vec<&Entry> {
    children_of(entries, "")
}

/// Writes the true size learned at read time onto an existing entry.
/// Returns whether the path was present.
pub fn record_size(entries: &mut [Entry], path: &str, size: u64) -> bool {
    match entries.iter_mut().find(|entry| entry.path == path) {
        Some(entry) => {
            entry.size = size;
            true
        }
        None => false,
    }
}

fn sibling_order(a: &Entry, b: &Entry) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    }
}
