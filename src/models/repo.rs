use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SourceError;

/// Canonical identifier of a remote repository.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Everything a repository reference can carry: the repository itself plus
/// an optional branch and in-repo path from a deep link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedRepoInput {
    pub id: RepoId,
    /// Branch named by a `/blob/<branch>/` or `/tree/<branch>/` link.
    /// Listing always reads the default branch; this is informational.
    pub branch: Option<String>,
    /// In-repo path named by a deep link, used to pre-select an entry.
    pub file_path: Option<String>,
}

static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:https?://)?(?:www\.)?github\.com/([^/\s]+)/([^/\s]+)(?:/(?:blob|tree)/([^/\s]+))?(?:/(.*))?$",
    )
    .expect("repository reference pattern")
});

/// Parses user input naming a repository.
///
/// Accepts bare `owner/repo` shorthand, `github.com` URLs with or without a
/// scheme, and deep links like `github.com/o/r/blob/main/src/lib.rs`. A
/// trailing `.git` on the repository name is dropped. Rejection happens
/// here, before any network traffic.
pub fn parse_repo_input(input: &str) -> Result<ParsedRepoInput, SourceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SourceError::InvalidInput(
            "missing owner or repository name".to_owned(),
        ));
    }

    // Bare owner/repo shorthand gets the host prepended before matching.
    let normalized = if trimmed.contains("github.com") {
        trimmed.to_owned()
    } else {
        format!("github.com/{trimmed}")
    };

    let captures = REPO_URL.captures(&normalized).ok_or_else(|| {
        SourceError::InvalidInput(format!("'{trimmed}' is not a GitHub repository reference"))
    })?;

    let owner = captures[1].to_owned();
    let repo_raw = &captures[2];
    let repo = repo_raw.strip_suffix(".git").unwrap_or(repo_raw).to_owned();
    if owner.is_empty() || repo.is_empty() {
        return Err(SourceError::InvalidInput(
            "missing owner or repository name".to_owned(),
        ));
    }

    let branch = captures.get(3).map(|m| m.as_str().to_owned());
    let file_path = captures
        .get(4)
        .map(|m| m.as_str().trim_matches('/').to_owned())
        .filter(|p| !p.is_empty());

    Ok(ParsedRepoInput {
        id: RepoId { owner, repo },
        branch,
        file_path,
    })
}
