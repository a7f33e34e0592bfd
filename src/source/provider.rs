use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::task;
use tracing::debug;

use crate::error::SourceError;
use crate::models::{EntryKind, HandleId};

/// Read-permission grant for a provider root.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PermissionState {
    Granted,
    /// Not granted yet; a request may still succeed.
    Prompt,
    Denied,
}

/// One enumerated child: its display name, kind, and freshly minted handle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawChild {
    pub name: String,
    pub kind: EntryKind,
    pub handle: HandleId,
}

/// File bytes plus the size learned at read time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub size: u64,
}

/// Seam between the local source and whatever owns real directory access.
///
/// The provider keeps every real handle and hands out opaque ids. An id can
/// go stale at any time, so every dereference is fallible. Enumeration is
/// shallow: one call lists direct children only.
#[async_trait]
pub trait DirProvider: Send + Sync {
    /// Opens `reference` as the browsing root. Yields the root handle and a
    /// display name.
    async fn open_root(&self, reference: &str) -> Result<(HandleId, String), SourceError>;

    /// Re-opens a root from a token persisted by an earlier run.
    async fn restore_root(&self, token: &str) -> Result<(HandleId, String), SourceError>;

    /// Token that `restore_root` will accept after a restart, if the
    /// current root can be persisted.
    fn persist_token(&self) -> Option<String>;

    async fn query_permission(&self) -> PermissionState;

    /// One explicit re-request after a failed query. Callers never loop on
    /// this.
    async fn request_permission(&self) -> PermissionState;

    /// Direct children of the directory behind `handle`.
    async fn read_dir(&self, handle: HandleId) -> Result<Vec<RawChild>, SourceError>;

    /// Bytes of the file behind `handle`.
    async fn read_file(&self, handle: HandleId) -> Result<FileContent, SourceError>;
}

/// Provider backed by the operating-system filesystem. The CLI-supplied
/// path plays the role of the picked root.
#[derive(Default)]
pub struct OsDirProvider {
    state: Mutex<OsState>,
}

#[derive(Default)]
struct OsState {
    root: Option<PathBuf>,
    handles: HashMap<u64, PathBuf>,
    paths: HashMap<PathBuf, u64>,
    next_handle: u64,
}

impl OsState {
    /// Handles are stable per path for the provider's lifetime.
    fn mint(&mut self, path: PathBuf) -> HandleId {
        if let Some(&id) = self.paths.get(&path) {
            return HandleId(id);
        }
        self.next_handle += 1;
        let id = self.next_handle;
        self.handles.insert(id, path.clone());
        self.paths.insert(path, id);
        HandleId(id)
    }
}

impl OsDirProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, OsState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle_path(&self, handle: HandleId) -> Result<PathBuf, SourceError> {
        self.lock_state()
            .handles
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("stale handle {}", handle.0)))
    }

    fn root_path(&self) -> Option<PathBuf> {
        self.lock_state().root.clone()
    }

    async fn open_at(&self, path: PathBuf) -> Result<(HandleId, String), SourceError> {
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|err| io_to_source(&path, err))?;
        if !metadata.is_dir() {
            return Err(SourceError::InvalidInput(format!(
                "'{}' is not a directory",
                path.display()
            )));
        }

        let name = root_display_name(&path);
        let mut state = self.lock_state();
        state.root = Some(path.clone());
        let handle = state.mint(path);
        Ok((handle, name))
    }
}

#[async_trait]
impl DirProvider for OsDirProvider {
    async fn open_root(&self, reference: &str) -> Result<(HandleId, String), SourceError> {
        debug!(%reference, "opening local root");
        self.open_at(PathBuf::from(reference)).await
    }

    async fn restore_root(&self, token: &str) -> Result<(HandleId, String), SourceError> {
        debug!(%token, "restoring local root");
        self.open_at(PathBuf::from(token)).await
    }

    fn persist_token(&self) -> Option<String> {
        self.root_path()
            .map(|root| root.to_string_lossy().into_owned())
    }

    async fn query_permission(&self) -> PermissionState {
        let Some(root) = self.root_path() else {
            return PermissionState::Prompt;
        };
        task::spawn_blocking(move || match std::fs::read_dir(&root) {
            Ok(_) => PermissionState::Granted,
            Err(_) => PermissionState::Denied,
        })
        .await
        .unwrap_or(PermissionState::Denied)
    }

    /// A plain filesystem has no prompt to raise; a request is a fresh
    /// validation of the root.
    async fn request_permission(&self) -> PermissionState {
        self.query_permission().await
    }

    async fn read_dir(&self, handle: HandleId) -> Result<Vec<RawChild>, SourceError> {
        let dir = self.handle_path(handle)?;
        let listed = task::spawn_blocking(move || list_dir(&dir))
            .await
            .map_err(|err| SourceError::Transient(format!("listing task failed: {err}")))??;

        let mut state = self.lock_state();
        Ok(listed
            .into_iter()
            .map(|(name, kind, path)| RawChild {
                name,
                kind,
                handle: state.mint(path),
            })
            .collect())
    }

    async fn read_file(&self, handle: HandleId) -> Result<FileContent, SourceError> {
        let path = self.handle_path(handle)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| io_to_source(&path, err))?;
        let size = bytes.len() as u64;
        Ok(FileContent { bytes, size })
    }
}

/// Symlinks and special files list as plain leaves and are never followed.
fn list_dir(dir: &Path) -> Result<Vec<(String, EntryKind, PathBuf)>, SourceError> {
    let reader = std::fs::read_dir(dir).map_err(|err| io_to_source(dir, err))?;
    let mut children = Vec::new();
    for entry in reader.filter_map(|e| e.ok()) {
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        children.push((
            entry.file_name().to_string_lossy().into_owned(),
            kind,
            entry.path(),
        ));
    }
    Ok(children)
}

fn root_display_name(path: &Path) -> String {
    if path == Path::new(".") {
        return ".".to_owned();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.as_os_str().to_string_lossy().into_owned())
}

fn io_to_source(path: &Path, err: std::io::Error) -> SourceError {
    match err.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            SourceError::PermissionDenied(path.display().to_string())
        }
        _ => SourceError::Transient(format!("{}: {err}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/inner.txt"), b"inner").unwrap();
        fs::write(temp.path().join("top.txt"), b"top content").unwrap();
        temp
    }

    #[tokio::test]
    async fn open_then_enumerate_then_read() {
        let temp = fixture();
        let provider = OsDirProvider::new();

        let (root, name) = provider
            .open_root(&temp.path().to_string_lossy())
            .await
            .unwrap();
        assert!(!name.is_empty());
        assert_eq!(provider.query_permission().await, PermissionState::Granted);

        let mut children = provider.read_dir(root).await.unwrap();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "sub");
        assert_eq!(children[0].kind, EntryKind::Directory);
        assert_eq!(children[1].name, "top.txt");
        assert_eq!(children[1].kind, EntryKind::File);

        let content = provider.read_file(children[1].handle).await.unwrap();
        assert_eq!(content.bytes, b"top content");
        assert_eq!(content.size, 11);
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let provider = OsDirProvider::new();
        let err = provider.open_root("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn file_as_root_is_invalid_input() {
        let temp = fixture();
        let provider = OsDirProvider::new();
        let err = provider
            .open_root(&temp.path().join("top.txt").to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_handle_is_stale() {
        let provider = OsDirProvider::new();
        let err = provider.read_dir(HandleId(999)).await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn persist_token_round_trips_through_restore() {
        let temp = fixture();
        let provider = OsDirProvider::new();
        provider
            .open_root(&temp.path().to_string_lossy())
            .await
            .unwrap();
        let token = provider.persist_token().unwrap();

        let restored = OsDirProvider::new();
        let (root, _) = restored.restore_root(&token).await.unwrap();
        assert_eq!(restored.read_dir(root).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn permission_is_prompt_before_any_root_is_opened() {
        let provider = OsDirProvider::new();
        assert_eq!(provider.query_permission().await, PermissionState::Prompt);
    }
}
