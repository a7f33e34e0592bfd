use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::cache::HandleCache;
use crate::error::SourceError;
use crate::models::{ContentRef, Entry, EntryKind, RepoId, leaf_name};

use super::provider::FileContent;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("repotree/", env!("CARGO_PKG_VERSION"));

/// Eager remote adapter. One recursive listing call materializes the whole
/// tree up front; expanding afterwards fetches nothing.
pub struct RemoteSource {
    client: Client,
    api_base: String,
    raw_base: String,
    repo: RepoId,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
}

impl RemoteSource {
    pub fn new(repo: RepoId) -> Self {
        Self::with_endpoints(repo, DEFAULT_API_BASE, DEFAULT_RAW_BASE)
    }

    pub fn with_endpoints(repo: RepoId, api_base: &str, raw_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            raw_base: raw_base.trim_end_matches('/').to_owned(),
            repo,
        }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Fetches the complete recursive tree of the default branch.
    ///
    /// Every entry carries its raw-content URL, derived from the listing
    /// alone; reading a file later needs no further listing calls.
    pub async fn list_root(&self) -> Result<Vec<Entry>, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/HEAD?recursive=1",
            self.api_base, self.repo.owner, self.repo.repo
        );
        debug!(%url, "fetching repository tree");

        let response = self
            .client
            .get(&url)
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.listing_error(status));
        }

        let listing: TreeResponse = response.json().await?;
        debug!(items = listing.tree.len(), "repository tree fetched");
        Ok(listing
            .tree
            .into_iter()
            .map(|item| self.entry_from_item(item))
            .collect())
    }

    /// The tree is already complete after `list_root`.
    pub async fn expand(&self, _path: &str) -> Result<Vec<Entry>, SourceError> {
        Ok(Vec::new())
    }

    /// Fetches an entry's bytes from its raw-content URL.
    pub async fn read(&self, cache: &HandleCache, path: &str) -> Result<FileContent, SourceError> {
        let url = match cache.resolve(path) {
            Some(ContentRef::Remote(url)) => url.clone(),
            Some(ContentRef::Local(_)) => {
                return Err(SourceError::InvalidInput(format!(
                    "'{path}' is not a remote entry"
                )));
            }
            None => {
                return Err(SourceError::NotFound(format!(
                    "no cached reference for '{path}'"
                )));
            }
        };

        debug!(%url, "fetching raw content");
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND => {
                    SourceError::NotFound(format!("'{path}' has no raw content"))
                }
                _ => SourceError::Transient(format!("raw content fetch failed with {status}")),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        let size = bytes.len() as u64;
        Ok(FileContent { bytes, size })
    }

    fn entry_from_item(&self, item: TreeItem) -> Entry {
        let raw_url = format!(
            "{}/{}/{}/HEAD/{}",
            self.raw_base, self.repo.owner, self.repo.repo, item.path
        );
        // Anything that is not a tree (blobs, submodule commits) is a leaf.
        let kind = if item.kind == "tree" {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Entry {
            name: leaf_name(&item.path).to_owned(),
            path: item.path,
            kind,
            size: item.size,
            content_ref: ContentRef::Remote(raw_url),
        }
    }

    fn listing_error(&self, status: StatusCode) -> SourceError {
        match status.as_u16() {
            // The upstream answers 404 for missing and 403/401 for private
            // repositories; all three read the same from outside.
            401 | 403 | 404 => SourceError::NotFound(format!(
                "repository '{}' not found or is private ({status})",
                self.repo
            )),
            429 => SourceError::Transient("rate limited by the repository host".to_owned()),
            _ => SourceError::Transient(format!("repository listing failed with {status}")),
        }
    }
}
