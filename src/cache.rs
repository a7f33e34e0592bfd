use std::collections::HashMap;

use tracing::debug;

use crate::models::ContentRef;

/// Session-lifetime map from entry path to its content reference.
///
/// First write per path wins. Individual entries are never evicted; the
/// whole cache is dropped when the source switches or the session resets,
/// so a path can never silently change meaning mid-session.
#[derive(Debug, Default)]
pub struct HandleCache {
    refs: HashMap<String, ContentRef>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `content_ref` for `path` unless the path is already known.
    /// Returns whether the write happened.
    pub fn insert_if_absent(&mut self, path: &str, content_ref: ContentRef) -> bool {
        if self.refs.contains_key(path) {
            return false;
        }
        self.refs.insert(path.to_owned(), content_ref);
        true
    }

    pub fn resolve(&self, path: &str) -> Option<&ContentRef> {
        self.refs.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.refs.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Wholesale invalidation. The only way entries ever leave the cache.
    pub fn clear(&mut self) {
        if !self.refs.is_empty() {
            debug!(dropped = self.refs.len(), "clearing content ref cache");
        }
        self.refs.clear();
    }
}
