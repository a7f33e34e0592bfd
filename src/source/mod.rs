mod local;
mod provider;
mod remote;

#[cfg(test)]
mod mock;

pub use local::LocalSource;
pub use provider::{DirProvider, FileContent, OsDirProvider, PermissionState, RawChild};
pub use remote::{DEFAULT_API_BASE, DEFAULT_RAW_BASE, RemoteSource};

#[cfg(test)]
pub use mock::MockDirProvider;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::HandleCache;
use crate::error::SourceError;
use crate::models::Entry;

/// Which kind of source a session is browsing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Remote,
    Local,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Remote => f.write_str("remote"),
            SourceKind::Local => f.write_str("local"),
        }
    }
}

/// The two interchangeable sources behind the unified tree.
///
/// A closed union dispatched by match; the extension seam sits one level
/// down, at the local directory provider.
pub enum Source {
    Remote(RemoteSource),
    Local(LocalSource),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Remote(_) => SourceKind::Remote,
            Source::Local(_) => SourceKind::Local,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Source::Remote(remote) => remote.repo().to_string(),
            Source::Local(local) => local.display_name().to_owned(),
        }
    }

    /// Complete listing for the eager remote tree; one root-level
    /// enumeration for the lazy local tree.
    pub async fn list_root(&self, cache: &HandleCache) -> Result<Vec<Entry>, SourceError> {
        match self {
            Source::Remote(remote) => remote.list_root().await,
            Source::Local(local) => local.list_root(cache).await,
        }
    }

    /// Direct children of `path`: empty for the already-complete remote
    /// tree, one freshly enumerated level for the local tree.
    pub async fn expand(&self, cache: &HandleCache, path: &str) -> Result<Vec<Entry>, SourceError> {
        match self {
            Source::Remote(remote) => remote.expand(path).await,
            Source::Local(local) => local.expand(cache, path).await,
        }
    }

    /// An entry's bytes, resolved through the handle cache.
    pub async fn read(&self, cache: &HandleCache, path: &str) -> Result<FileContent, SourceError> {
        match self {
            Source::Remote(remote) => remote.read(cache, path).await,
            Source::Local(local) => local.read(cache, path).await,
        }
    }
}
