use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::models::parse_repo_input;
use crate::persist::{SessionRecord, SessionStore};
use crate::session::{ExpandStart, Session};
use crate::source::{
    DEFAULT_API_BASE, DEFAULT_RAW_BASE, DirProvider, FileContent, LocalSource, RemoteSource,
    Source, SourceKind,
};

/// Remote endpoints, overridable for tests and mirrors.
#[derive(Clone, Debug)]
pub struct RemoteEndpoints {
    pub api_base: String,
    pub raw_base: String,
}

impl Default for RemoteEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            raw_base: DEFAULT_RAW_BASE.to_owned(),
        }
    }
}

/// Owns the session, the active source adapter, and the persistence store,
/// and drives the begin/apply protocol from a single task.
pub struct Explorer {
    session: Session,
    source: Option<Source>,
    store: SessionStore,
    endpoints: RemoteEndpoints,
}

impl Explorer {
    pub fn new(store: SessionStore) -> Self {
        Self::with_endpoints(store, RemoteEndpoints::default())
    }

    pub fn with_endpoints(store: SessionStore, endpoints: RemoteEndpoints) -> Self {
        Self {
            session: Session::new(),
            source: None,
            store,
            endpoints,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn display_name(&self) -> Option<String> {
        self.source.as_ref().map(Source::display_name)
    }

    /// Parses `input` and switches to the remote source it names. The whole
    /// tree is listed eagerly; on success the session is persisted and any
    /// deep-linked path is pre-selected.
    ///
    /// Malformed input is rejected before any network traffic and leaves
    /// the current session untouched.
    pub async fn open_remote(&mut self, input: &str) -> Result<(), SourceError> {
        let parsed = parse_repo_input(input)?;
        if let Some(branch) = &parsed.branch {
            debug!(%branch, "deep link names a branch; listing reads the default branch");
        }

        let remote = RemoteSource::with_endpoints(
            parsed.id.clone(),
            &self.endpoints.api_base,
            &self.endpoints.raw_base,
        );
        let ticket = self.session.begin_root_load(SourceKind::Remote);
        let result = remote.list_root().await;
        let error = result.as_ref().err().cloned();
        self.session.apply_root_loaded(ticket, result);
        if let Some(error) = error {
            self.source = None;
            return Err(error);
        }
        self.source = Some(Source::Remote(remote));

        let record = SessionRecord {
            source: SourceKind::Remote,
            reference: parsed.id.to_string(),
            display_name: parsed.id.to_string(),
        };
        if let Err(err) = self.store.save(&record).await {
            warn!("failed to persist session: {err}");
        }

        if let Some(file_path) = parsed.file_path
            && self.session.select(&file_path).is_ok()
        {
            debug!(path = %file_path, "pre-selected deep-linked entry");
        }
        Ok(())
    }

    /// Switches to the local directory named by `reference`, listing only
    /// the root level. Read permission is verified before the session
    /// switches, so a refused grant leaves the current session untouched.
    pub async fn open_local(
        &mut self,
        provider: Arc<dyn DirProvider>,
        reference: &str,
    ) -> Result<(), SourceError> {
        let local = LocalSource::open(provider, reference).await?;
        self.load_local_root(local, true).await
    }

    /// Materializes the direct children of the directory at `path`. A
    /// request for a path already being fetched joins the in-flight fetch.
    pub async fn expand(&mut self, path: &str) -> Result<(), SourceError> {
        let ticket = match self.session.begin_expand(path)? {
            ExpandStart::Joined => return Ok(()),
            ExpandStart::Fetch(ticket) => ticket,
        };
        let result = match self.source.as_ref() {
            Some(source) => source.expand(self.session.cache(), path).await,
            None => Err(SourceError::InvalidInput("no source is active".to_owned())),
        };
        let error = result.as_ref().err().cloned();
        self.session.apply_expand(ticket, path, result);
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Expands directories breadth-first until `depth` levels below the
    /// root are materialized (`None` means no limit). A directory that
    /// fails to expand is skipped; its siblings keep going.
    pub async fn expand_to_depth(&mut self, depth: Option<usize>) -> Result<(), SourceError> {
        let mut level = 0usize;
        loop {
            if let Some(limit) = depth
                && level + 1 >= limit
            {
                break;
            }
            let frontier: Vec<String> = self
                .session
                .entries()
                .iter()
                .filter(|entry| entry.is_dir())
                .filter(|entry| path_depth(&entry.path) == level)
                .filter(|entry| !self.session.is_expanded(&entry.path))
                .map(|entry| entry.path.clone())
                .collect();
            if frontier.is_empty() {
                break;
            }
            for path in frontier {
                if let Err(error) = self.expand(&path).await {
                    warn!(%path, %error, "skipping unexpandable directory");
                }
            }
            level += 1;
        }
        Ok(())
    }

    /// Expands the ancestor chain of `path` so that a lazily materialized
    /// entry becomes resolvable.
    pub async fn ensure_path_loaded(&mut self, path: &str) -> Result<(), SourceError> {
        let segments: Vec<&str> = path.split('/').collect();
        let mut prefix = String::new();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            let known_dir = self
                .session
                .entries()
                .iter()
                .any(|entry| entry.path == prefix && entry.is_dir());
            if !known_dir {
                // The leaf lookup will report the missing ancestor.
                break;
            }
            if !self.session.is_expanded(&prefix) {
                self.expand(&prefix).await?;
            }
        }
        Ok(())
    }

    /// Reads the bytes of the file at `path` through the handle cache.
    /// Local reads teach the entry its true size.
    pub async fn read_file(&mut self, path: &str) -> Result<FileContent, SourceError> {
        match self.session.entries().iter().find(|e| e.path == path) {
            None => {
                return Err(SourceError::NotFound(format!("'{path}' is not in the tree")));
            }
            Some(entry) if entry.is_dir() => {
                return Err(SourceError::InvalidInput(format!("'{path}' is a directory")));
            }
            Some(_) => {}
        }
        let Some(source) = self.source.as_ref() else {
            return Err(SourceError::InvalidInput("no source is active".to_owned()));
        };
        let is_local = source.kind() == SourceKind::Local;

        match source.read(self.session.cache(), path).await {
            Ok(content) => {
                if is_local {
                    self.session.record_file_size(path, content.size);
                }
                Ok(content)
            }
            Err(error) => {
                self.session.record_error(error.clone());
                Err(error)
            }
        }
    }

    /// Resumes the persisted session, if there is one.
    ///
    /// A remote record re-runs the eager listing. A local record is
    /// restored and permission-revalidated first; if that fails, the stored
    /// record is discarded and the session stays idle instead of erroring.
    pub async fn resume(
        &mut self,
        provider: Arc<dyn DirProvider>,
    ) -> Result<Option<SourceKind>, SourceError> {
        let Some(record) = self.store.load().await else {
            return Ok(None);
        };
        info!(source = %record.source, reference = %record.reference, "resuming session");

        match record.source {
            SourceKind::Remote => {
                self.open_remote(&record.reference).await?;
                Ok(Some(SourceKind::Remote))
            }
            SourceKind::Local => {
                let local = match LocalSource::restore(provider, &record.reference).await {
                    Ok(local) => local,
                    Err(error) => {
                        info!(%error, "discarding unusable local session record");
                        if let Err(err) = self.store.clear().await {
                            warn!("failed to remove session record: {err}");
                        }
                        return Ok(None);
                    }
                };
                self.load_local_root(local, false).await?;
                Ok(Some(SourceKind::Local))
            }
        }
    }

    /// Clears the session and forgets the persisted record.
    pub async fn reset(&mut self) -> Result<(), SourceError> {
        self.session.reset();
        self.source = None;
        self.store
            .clear()
            .await
            .map_err(|err| SourceError::Transient(format!("failed to remove session record: {err}")))
    }

    async fn load_local_root(
        &mut self,
        local: LocalSource,
        persist: bool,
    ) -> Result<(), SourceError> {
        let ticket = self.session.begin_root_load(SourceKind::Local);
        let result = local.list_root(self.session.cache()).await;
        let error = result.as_ref().err().cloned();
        self.session.apply_root_loaded(ticket, result);
        if let Some(error) = error {
            self.source = None;
            return Err(error);
        }

        let token = local.persist_token();
        let display_name = local.display_name().to_owned();
        self.source = Some(Source::Local(local));

        if persist && let Some(token) = token {
            let record = SessionRecord {
                source: SourceKind::Local,
                reference: token,
                display_name,
            };
            if let Err(err) = self.store.save(&record).await {
                warn!("failed to persist session: {err}");
            }
        }
        Ok(())
    }
}

fn path_depth(path: &str) -> usize {
    path.matches('/').count()
}
