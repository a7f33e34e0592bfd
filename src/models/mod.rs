mod entry;
mod repo;

pub use entry::{ContentRef, Entry, EntryKind, HandleId, is_direct_child, join_path, leaf_name};
pub use repo::{ParsedRepoInput, RepoId, parse_repo_input};
