/// Key of the entry that lists the watched root as its only child.
///
/// This is the parent id a tree view asks for first; it is never a remote path.
pub const VIRTUAL_ROOT: &str = "";

/// Builds the absolute path of `name` below `parent`.
pub fn join_child(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the parent of an absolute path, `None` for `/` itself.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Absolute, no trailing slash (except `/`), no empty segments.
pub fn is_valid_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    path.starts_with('/') && path[1..].split('/').all(|segment| !segment.is_empty())
}
