use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{EntryKind, HandleId, join_path};

use super::provider::{DirProvider, FileContent, PermissionState, RawChild};

/// Scripted in-memory provider for exercising the local source.
///
/// Directories and files are registered by slash-delimited path relative to
/// the root (the root itself is the empty string). Handles are stable per
/// path, and every enumeration and permission request is recorded.
#[derive(Clone)]
pub struct MockDirProvider {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    root_name: String,
    dirs: HashMap<String, Vec<(String, EntryKind)>>,
    files: HashMap<String, Vec<u8>>,
    errors: HashMap<String, SourceError>,
    handles: HashMap<u64, String>,
    path_ids: HashMap<String, u64>,
    next_handle: u64,
    permission: PermissionState,
    grant_on_request: bool,
    supported: bool,
    read_dir_calls: Vec<String>,
    permission_requests: usize,
}

impl MockDirProvider {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                root_name: root_name.into(),
                dirs: HashMap::from([(String::new(), Vec::new())]),
                files: HashMap::new(),
                errors: HashMap::new(),
                handles: HashMap::new(),
                path_ids: HashMap::new(),
                next_handle: 0,
                permission: PermissionState::Granted,
                grant_on_request: false,
                supported: true,
                read_dir_calls: Vec::new(),
                permission_requests: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock provider lock")
    }

    /// Registers a directory and records it as a child of its parent.
    pub fn add_dir(&self, path: &str) {
        let mut inner = self.lock();
        inner.dirs.entry(path.to_owned()).or_default();
        inner.link_to_parent(path, EntryKind::Directory);
    }

    /// Registers a file with the given bytes.
    pub fn add_file(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let mut inner = self.lock();
        inner.files.insert(path.to_owned(), bytes.into());
        inner.link_to_parent(path, EntryKind::File);
    }

    /// Forces the next operations touching `path` to fail.
    pub fn set_error(&self, path: &str, error: SourceError) {
        self.lock().errors.insert(path.to_owned(), error);
    }

    /// Drops the grant. Whether a later request succeeds is controlled by
    /// `grant_on_request`.
    pub fn revoke_permission(&self, grant_on_request: bool) {
        let mut inner = self.lock();
        inner.permission = PermissionState::Prompt;
        inner.grant_on_request = grant_on_request;
    }

    pub fn deny_permission(&self) {
        let mut inner = self.lock();
        inner.permission = PermissionState::Denied;
        inner.grant_on_request = false;
    }

    pub fn set_unsupported(&self) {
        self.lock().supported = false;
    }

    pub fn read_dir_calls(&self) -> Vec<String> {
        self.lock().read_dir_calls.clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.lock().permission_requests
    }
}

impl Inner {
    fn link_to_parent(&mut self, path: &str, kind: EntryKind) {
        let (parent, name) = match path.rfind('/') {
            Some(index) => (&path[..index], &path[index + 1..]),
            None => ("", path),
        };
        let children = self.dirs.entry(parent.to_owned()).or_default();
        if !children.iter().any(|(existing, _)| existing == name) {
            children.push((name.to_owned(), kind));
        }
    }

    fn mint(&mut self, path: &str) -> HandleId {
        if let Some(&id) = self.path_ids.get(path) {
            return HandleId(id);
        }
        self.next_handle += 1;
        let id = self.next_handle;
        self.handles.insert(id, path.to_owned());
        self.path_ids.insert(path.to_owned(), id);
        HandleId(id)
    }

    fn handle_path(&self, handle: HandleId) -> Result<String, SourceError> {
        self.handles
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("stale handle {}", handle.0)))
    }
}

#[async_trait]
impl DirProvider for MockDirProvider {
    async fn open_root(&self, _reference: &str) -> Result<(HandleId, String), SourceError> {
        let mut inner = self.lock();
        if !inner.supported {
            return Err(SourceError::Unsupported(
                "directory access is not available here".to_owned(),
            ));
        }
        let name = inner.root_name.clone();
        let handle = inner.mint("");
        Ok((handle, name))
    }

    async fn restore_root(&self, token: &str) -> Result<(HandleId, String), SourceError> {
        let mut inner = self.lock();
        if !inner.supported {
            return Err(SourceError::Unsupported(
                "directory access is not available here".to_owned(),
            ));
        }
        if token != inner.root_name {
            return Err(SourceError::NotFound(format!("no stored root '{token}'")));
        }
        let name = inner.root_name.clone();
        let handle = inner.mint("");
        Ok((handle, name))
    }

    fn persist_token(&self) -> Option<String> {
        Some(self.lock().root_name.clone())
    }

    async fn query_permission(&self) -> PermissionState {
        self.lock().permission
    }

    async fn request_permission(&self) -> PermissionState {
        let mut inner = self.lock();
        inner.permission_requests += 1;
        if inner.grant_on_request {
            inner.permission = PermissionState::Granted;
        }
        inner.permission
    }

    async fn read_dir(&self, handle: HandleId) -> Result<Vec<RawChild>, SourceError> {
        let mut inner = self.lock();
        let dir = inner.handle_path(handle)?;
        inner.read_dir_calls.push(dir.clone());

        if let Some(error) = inner.errors.get(&dir) {
            return Err(error.clone());
        }
        let children = inner
            .dirs
            .get(&dir)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("no mock directory '{dir}'")))?;

        Ok(children
            .into_iter()
            .map(|(name, kind)| {
                let child_path = join_path(&dir, &name);
                RawChild {
                    handle: inner.mint(&child_path),
                    name,
                    kind,
                }
            })
            .collect())
    }

    async fn read_file(&self, handle: HandleId) -> Result<FileContent, SourceError> {
        let inner = self.lock();
        let path = inner.handle_path(handle)?;
        if let Some(error) = inner.errors.get(&path) {
            return Err(error.clone());
        }
        let bytes = inner
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("no mock file '{path}'")))?;
        let size = bytes.len() as u64;
        Ok(FileContent { bytes, size })
    }
}
