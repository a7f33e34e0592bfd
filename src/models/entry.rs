/// Kind is stored explicitly, never inferred from the path at use sites.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Opaque token for a handle owned by the local directory provider.
///
/// The provider keeps the real handle; an id can go stale at any time, so
/// every dereference is fallible.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct HandleId(pub u64);

/// Reference for fetching an entry's bytes later.
///
/// `Remote` holds a derivable raw-content URL and is pure data. `Local`
/// holds a non-owning provider token. Neither is inspected by the tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentRef {
    Remote(String),
    Local(HandleId),
}

/// One node of the unified tree.
///
/// `path` is slash-delimited and relative to the source root; it is the
/// identity key everywhere. Local entries carry size 0 until their bytes
/// are actually read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub content_ref: ContentRef,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Last segment of a slash-delimited path.
pub fn leaf_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Joins a parent path and a child name. The root parent is the empty string.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

/// True when `child` extends `parent` by exactly one segment. The empty
/// string stands for the root.
pub fn is_direct_child(parent: &str, child: &str) -> bool {
    if parent.is_empty() {
        return !child.is_empty() && !child.contains('/');
    }
    match child.strip_prefix(parent) {
        Some(rest) => match rest.strip_prefix('/') {
            Some(segment) => !segment.is_empty() && !segment.contains('/'),
            None => false,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_name_takes_the_last_segment() {
        assert_eq!(leaf_name("src/models/entry.rs"), "entry.rs");
        assert_eq!(leaf_name("README.md"), "README.md");
        assert_eq!(leaf_name(""), "");
    }

    #[test]
    fn join_path_treats_empty_parent_as_root() {
        assert_eq!(join_path("", "src"), "src");
        assert_eq!(join_path("src", "main.rs"), "src/main.rs");
    }

    #[test]
    fn direct_children_extend_by_exactly_one_segment() {
        assert!(is_direct_child("", "src"));
        assert!(is_direct_child("src", "src/main.rs"));
        assert!(!is_direct_child("", "src/main.rs"));
        assert!(!is_direct_child("src", "src/models/entry.rs"));
        assert!(!is_direct_child("src", "srcdir/main.rs"));
        assert!(!is_direct_child("src", "src"));
        assert!(!is_direct_child("", ""));
    }
}
