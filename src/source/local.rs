use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::HandleCache;
use crate::error::SourceError;
use crate::models::{ContentRef, Entry, HandleId, join_path};

use super::provider::{DirProvider, FileContent, PermissionState};

/// Lazy local adapter. Each expansion materializes exactly one directory
/// level; parent handles are resolved through the caller's cache, and
/// children are registered there when the batch is merged.
pub struct LocalSource {
    provider: Arc<dyn DirProvider>,
    root_handle: HandleId,
    display_name: String,
}

impl std::fmt::Debug for LocalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSource")
            .field("root_handle", &self.root_handle)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl LocalSource {
    /// Opens a fresh root through the provider and verifies read access.
    pub async fn open(provider: Arc<dyn DirProvider>, reference: &str) -> Result<Self, SourceError> {
        let (root_handle, display_name) = provider.open_root(reference).await?;
        let source = Self {
            provider,
            root_handle,
            display_name,
        };
        source.ensure_read_permission().await?;
        Ok(source)
    }

    /// Re-opens a persisted root. Read access is re-validated before
    /// anything else happens with the handle.
    pub async fn restore(provider: Arc<dyn DirProvider>, token: &str) -> Result<Self, SourceError> {
        let (root_handle, display_name) = provider.restore_root(token).await?;
        let source = Self {
            provider,
            root_handle,
            display_name,
        };
        source.ensure_read_permission().await?;
        Ok(source)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn persist_token(&self) -> Option<String> {
        self.provider.persist_token()
    }

    /// The root listing is one shallow enumeration of the root directory.
    pub async fn list_root(&self, cache: &HandleCache) -> Result<Vec<Entry>, SourceError> {
        self.expand(cache, "").await
    }

    /// Enumerates the direct children of the directory at `path`.
    ///
    /// Children carry size 0; the true size is learned when a file is read.
    pub async fn expand(&self, cache: &HandleCache, path: &str) -> Result<Vec<Entry>, SourceError> {
        self.ensure_read_permission().await?;
        let handle = self.dir_handle(cache, path)?;
        let children = self.provider.read_dir(handle).await?;
        debug!(%path, count = children.len(), "enumerated directory level");

        Ok(children
            .into_iter()
            .map(|child| Entry {
                path: join_path(path, &child.name),
                name: child.name,
                kind: child.kind,
                size: 0,
                content_ref: ContentRef::Local(child.handle),
            })
            .collect())
    }

    /// Reads a file's bytes through its cached handle.
    pub async fn read(&self, cache: &HandleCache, path: &str) -> Result<FileContent, SourceError> {
        self.ensure_read_permission().await?;
        match cache.resolve(path) {
            Some(ContentRef::Local(handle)) => self.provider.read_file(*handle).await,
            Some(ContentRef::Remote(_)) => Err(SourceError::InvalidInput(format!(
                "'{path}' is not a local entry"
            ))),
            None => Err(SourceError::NotFound(format!(
                "no cached handle for '{path}'"
            ))),
        }
    }

    /// Queries the grant and re-requests exactly once if it lapsed.
    ///
    /// Denial leaves cached handles in place so the path can be validated
    /// again later without re-enumerating anything.
    async fn ensure_read_permission(&self) -> Result<(), SourceError> {
        if self.provider.query_permission().await == PermissionState::Granted {
            return Ok(());
        }
        debug!("read grant lapsed, re-requesting");
        if self.provider.request_permission().await == PermissionState::Granted {
            return Ok(());
        }
        warn!(root = %self.display_name, "read access not granted");
        Err(SourceError::PermissionDenied(format!(
            "read access to '{}' was not granted",
            self.display_name
        )))
    }

    fn dir_handle(&self, cache: &HandleCache, path: &str) -> Result<HandleId, SourceError> {
        if path.is_empty() {
            return Ok(self.root_handle);
        }
        match cache.resolve(path) {
            Some(ContentRef::Local(handle)) => Ok(*handle),
            Some(ContentRef::Remote(_)) => Err(SourceError::InvalidInput(format!(
                "'{path}' is not a local directory"
            ))),
            None => Err(SourceError::NotFound(format!(
                "no cached handle for directory '{path}'"
            ))),
        }
    }
}
