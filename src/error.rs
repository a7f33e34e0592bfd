use thiserror::Error;

/// Failure taxonomy shared by every source adapter.
///
/// Expected failures surface as values so callers can decide whether one
/// poisons the whole session or only a single node. Variants carry a
/// human-readable detail string; the variant itself is the contract.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SourceError {
    /// The named thing does not exist, or the upstream refuses to admit
    /// it exists (missing repository, private repository, deleted file).
    #[error("not found: {0}")]
    NotFound(String),

    /// Read access was queried, re-requested once, and still not granted.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The running environment cannot provide the requested capability.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Network trouble, rate limiting, or another failure worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The caller's input was rejected before any I/O happened.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transient(err.to_string())
    }
}
