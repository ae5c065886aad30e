//! Local replica of the watched subtree.
//!
//! The mirror maps every visited path to the full paths of its direct children and
//! keeps the aggregate counts derived from that map next to it, so that readers always
//! see counts that agree with the map they were computed from.

mod aggregate;
mod path;
mod tree_mirror;

pub use aggregate::AggregateCounts;
pub use path::{VIRTUAL_ROOT, is_valid_path, join_child, parent_of};
pub use tree_mirror::{MirrorSnapshot, TreeMirror};
