use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cache::HandleCache;
use crate::core::merge::{self, MergeStats};
use crate::error::SourceError;
use crate::models::Entry;
use crate::source::SourceKind;

/// Where the session is in its lifecycle.
///
/// Expansion failures do not leave `Ready`; only a failed root listing
/// reaches `Failed`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    /// Root listing in flight.
    Loading(SourceKind),
    Ready(SourceKind),
    /// The root listing failed.
    Failed(SourceKind, SourceError),
}

/// Ties an asynchronous completion to the session state it was issued
/// under. A completion presenting a stale ticket is discarded without
/// side effects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ticket {
    generation: u64,
}

/// How an expansion request was admitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExpandStart {
    /// The caller owns the fetch for this path.
    Fetch(Ticket),
    /// The same path is already being fetched; this request rides along.
    Joined,
}

/// What applying a completion did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApplyOutcome {
    Merged(MergeStats),
    /// The completion belonged to an earlier generation and was dropped.
    Stale,
    /// The completion carried an error; it was recorded, not merged.
    Failed,
}

/// Single-owner state machine for one browsing session.
///
/// All mutation happens through `begin_*`/`apply_*` pairs on the owning
/// task. Switching sources bumps the generation, which retroactively
/// invalidates every ticket still in flight; no locking is involved.
pub struct Session {
    generation: u64,
    phase: Phase,
    entries: Vec<Entry>,
    cache: HandleCache,
    expanded: HashSet<String>,
    pending: HashSet<String>,
    selected: Option<String>,
    last_error: Option<SourceError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            generation: 0,
            phase: Phase::Idle,
            entries: Vec::new(),
            cache: HandleCache::new(),
            expanded: HashSet::new(),
            pending: HashSet::new(),
            selected: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn cache(&self) -> &HandleCache {
        &self.cache
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn selected(&self) -> Option<&Entry> {
        let path = self.selected.as_deref()?;
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn last_error(&self) -> Option<&SourceError> {
        self.last_error.as_ref()
    }

    /// Starts loading a new source. Everything belonging to the previous
    /// source is dropped and outstanding tickets become stale.
    pub fn begin_root_load(&mut self, kind: SourceKind) -> Ticket {
        self.generation += 1;
        self.phase = Phase::Loading(kind);
        self.entries.clear();
        self.cache.clear();
        self.expanded.clear();
        self.pending.clear();
        self.selected = None;
        self.last_error = None;
        info!(source = %kind, generation = self.generation, "loading root listing");
        Ticket {
            generation: self.generation,
        }
    }

    pub fn apply_root_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Entry>, SourceError>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale root listing"
            );
            return ApplyOutcome::Stale;
        }
        let kind = match self.phase {
            Phase::Loading(kind) => kind,
            _ => {
                warn!("root listing completion arrived outside a root load");
                return ApplyOutcome::Stale;
            }
        };

        match result {
            Ok(batch) => {
                let stats = merge::merge_batch(&mut self.entries, &mut self.cache, batch);
                self.expanded.insert(String::new());
                self.phase = Phase::Ready(kind);
                info!(source = %kind, entries = self.entries.len(), "root listing ready");
                ApplyOutcome::Merged(stats)
            }
            Err(error) => {
                warn!(source = %kind, %error, "root listing failed");
                self.last_error = Some(error.clone());
                self.phase = Phase::Failed(kind, error);
                ApplyOutcome::Failed
            }
        }
    }

    /// Admits an expansion request for the directory at `path`.
    ///
    /// A request for a path whose fetch is already in flight joins it
    /// instead of issuing a second fetch.
    pub fn begin_expand(&mut self, path: &str) -> Result<ExpandStart, SourceError> {
        if !matches!(self.phase, Phase::Ready(_)) {
            return Err(SourceError::InvalidInput(
                "no source is ready to expand".to_owned(),
            ));
        }
        if !path.is_empty() {
            match self.entries.iter().find(|entry| entry.path == path) {
                Some(entry) if entry.is_dir() => {}
                Some(_) => {
                    return Err(SourceError::InvalidInput(format!(
                        "'{path}' is not a directory"
                    )));
                }
                None => {
                    return Err(SourceError::NotFound(format!("'{path}' is not in the tree")));
                }
            }
        }
        if self.pending.contains(path) {
            debug!(%path, "expansion already in flight, joining");
            return Ok(ExpandStart::Joined);
        }
        self.pending.insert(path.to_owned());
        debug!(%path, generation = self.generation, "expanding directory");
        Ok(ExpandStart::Fetch(Ticket {
            generation: self.generation,
        }))
    }

    pub fn apply_expand(
        &mut self,
        ticket: Ticket,
        path: &str,
        result: Result<Vec<Entry>, SourceError>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation {
            debug!(%path, "discarding stale expansion");
            return ApplyOutcome::Stale;
        }
        self.pending.remove(path);

        match result {
            Ok(batch) => {
                let stats = merge::merge_batch(&mut self.entries, &mut self.cache, batch);
                self.expanded.insert(path.to_owned());
                ApplyOutcome::Merged(stats)
            }
            Err(error) => {
                // The failed directory stays collapsed; everything already
                // merged stays browsable.
                warn!(%path, %error, "expansion failed");
                self.last_error = Some(error);
                ApplyOutcome::Failed
            }
        }
    }

    /// Collapses a directory in the view. Its entries stay merged and its
    /// handles stay cached.
    pub fn collapse(&mut self, path: &str) {
        self.expanded.remove(path);
    }

    pub fn select(&mut self, path: &str) -> Result<(), SourceError> {
        if !self.entries.iter().any(|entry| entry.path == path) {
            return Err(SourceError::NotFound(format!("'{path}' is not in the tree")));
        }
        self.selected = Some(path.to_owned());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Records a failure that happened outside the load/expand protocol,
    /// such as a file read.
    pub fn record_error(&mut self, error: SourceError) {
        self.last_error = Some(error);
    }

    /// Writes the size learned from reading a file back onto its entry.
    pub fn record_file_size(&mut self, path: &str, size: u64) {
        merge::record_size(&mut self.entries, path, size);
    }

    /// Returns to `Idle`. Outstanding tickets become stale and the handle
    /// cache is dropped wholesale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.entries.clear();
        self.cache.clear();
        self.expanded.clear();
        self.pending.clear();
        self.selected = None;
        self.last_error = None;
        info!(generation = self.generation, "session reset");
    }
}
