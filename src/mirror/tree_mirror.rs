use hashlink::{LinkedHashMap, LinkedHashSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::mirror::{AggregateCounts, VIRTUAL_ROOT};

/// Shared, lock-guarded replica of the watched subtree.
///
/// All mutations take the write lock once, apply the whole change and recompute the
/// counts before releasing it. Readers never see a map and counts that disagree.
#[derive(Debug)]
pub struct TreeMirror {
    root: String,
    state: RwLock<MirrorState>,
}

#[derive(Debug, Clone)]
struct MirrorState {
    entries: LinkedHashMap<String, Vec<String>>,
    unwatched: LinkedHashSet<String>,
    counts: AggregateCounts,
}

/// A consistent copy of the mirror taken under a single read lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSnapshot {
    pub root: String,
    pub entries: LinkedHashMap<String, Vec<String>>,
    pub counts: AggregateCounts,
}

impl MirrorSnapshot {
    pub fn children_of(&self, path: &str) -> &[String] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_branch(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }
}

impl MirrorState {
    fn seeded(root: &str) -> Self {
        let mut entries = LinkedHashMap::new();
        entries.insert(VIRTUAL_ROOT.to_string(), vec![root.to_string()]);
        MirrorState {
            entries,
            unwatched: LinkedHashSet::new(),
            counts: AggregateCounts::default(),
        }
    }

    /// Removes the entries of `path` and every mirrored descendant of it.
    fn prune(&mut self, path: &str) {
        let mut pending = vec![path.to_string()];
        while let Some(current) = pending.pop() {
            self.unwatched.remove(&current);
            if let Some(children) = self.entries.remove(&current) {
                pending.extend(children);
            }
        }
    }

    fn store(&mut self, path: String, children: Vec<String>) {
        let stale = self
            .entries
            .get(&path)
            .map(|old| {
                old.iter()
                    .filter(|child| !children.contains(child))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for orphan in stale {
            debug!("Pruning '{}' from the mirror", orphan);
            self.prune(&orphan);
        }

        self.unwatched.remove(&path);
        self.entries.replace(path, children);
    }
}

impl TreeMirror {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let state = MirrorState::seeded(&root);
        TreeMirror {
            root,
            state: RwLock::new(state),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Children of `path`, empty if the path was never visited.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.state
            .read()
            .entries
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// A path is a branch once its children were successfully queried.
    pub fn is_branch(&self, path: &str) -> bool {
        self.state.read().entries.contains_key(path)
    }

    pub fn counts(&self) -> AggregateCounts {
        self.state.read().counts
    }

    pub fn snapshot(&self) -> MirrorSnapshot {
        let state = self.state.read();
        MirrorSnapshot {
            root: self.root.clone(),
            entries: state.entries.clone(),
            counts: state.counts,
        }
    }

    /// Replaces the child list of `path` and returns the recomputed counts.
    ///
    /// Children that are no longer listed are pruned together with their subtrees.
    pub fn replace_entry(&self, path: impl Into<String>, children: Vec<String>) -> AggregateCounts {
        self.replace_entries(vec![(path.into(), children)])
    }

    /// Applies several entry replacements as one write.
    pub fn replace_entries(&self, entries: Vec<(String, Vec<String>)>) -> AggregateCounts {
        let mut state = self.state.write();
        for (path, children) in entries {
            state.store(path, children);
        }
        state.counts = AggregateCounts::compute(&state.entries, &self.root);
        state.counts
    }

    /// Drops everything except the seed entry.
    pub fn reset(&self) -> AggregateCounts {
        let mut state = self.state.write();
        *state = MirrorState::seeded(&self.root);
        state.counts
    }

    /// Records that `path` has no armed children watch and needs another visit.
    pub fn mark_unwatched(&self, path: impl Into<String>) {
        self.state.write().unwatched.insert(path.into());
    }

    pub fn clear_unwatched(&self, path: &str) {
        self.state.write().unwatched.remove(path);
    }

    pub fn unwatched(&self) -> Vec<String> {
        self.state.read().unwatched.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn populated() -> TreeMirror {
        let mirror = TreeMirror::new("/a");
        mirror.replace_entries(vec![
            ("/a".into(), paths(&["/a/b", "/a/c"])),
            ("/a/b".into(), paths(&["/a/b/d"])),
            ("/a/c".into(), vec![]),
            ("/a/b/d".into(), vec![]),
        ]);
        mirror
    }

    #[test]
    fn new_mirror_only_holds_seed() {
        let mirror = TreeMirror::new("/a");

        assert_eq!(mirror.children_of(VIRTUAL_ROOT), paths(&["/a"]));
        assert!(!mirror.is_branch("/a"));
        assert_eq!(mirror.counts(), AggregateCounts::default());
    }

    #[test]
    fn replace_entry_recomputes_counts() {
        let mirror = populated();

        let counts = mirror.replace_entry("/a/c", paths(&["/a/c/x", "/a/c/y"]));

        assert_eq!(counts, AggregateCounts { direct: 2, all: 5 });
        assert_eq!(mirror.counts(), counts);
    }

    #[test]
    fn replacing_with_same_children_is_idempotent() {
        let mirror = populated();
        let before = mirror.snapshot();

        mirror.replace_entry("/a", paths(&["/a/b", "/a/c"]));

        assert_eq!(mirror.snapshot(), before);
    }

    #[test]
    fn removed_children_are_pruned_with_their_subtree() {
        let mirror = populated();
        mirror.mark_unwatched("/a/b/d");

        let counts = mirror.replace_entry("/a", paths(&["/a/c"]));

        assert!(!mirror.is_branch("/a/b"));
        assert!(!mirror.is_branch("/a/b/d"));
        assert!(mirror.unwatched().is_empty());
        assert_eq!(counts, AggregateCounts { direct: 1, all: 1 });
    }

    #[test]
    fn storing_an_entry_clears_its_unwatched_marker() {
        let mirror = populated();
        mirror.mark_unwatched("/a/c");

        mirror.replace_entry("/a/c", vec![]);

        assert!(mirror.unwatched().is_empty());
    }

    #[test]
    fn reset_returns_to_seed() {
        let mirror = populated();
        mirror.mark_unwatched("/a/c");

        let counts = mirror.reset();

        assert_eq!(counts, AggregateCounts::default());
        assert_eq!(mirror.snapshot().entries.len(), 1);
        assert!(mirror.unwatched().is_empty());
    }

    #[test]
    fn snapshot_answers_tree_view_queries() {
        let snapshot = populated().snapshot();

        assert_eq!(snapshot.children_of("/a/b"), paths(&["/a/b/d"]).as_slice());
        assert!(snapshot.is_branch("/a/c"));
        assert!(!snapshot.is_branch("/a/zzz"));
        assert!(snapshot.children_of("/a/zzz").is_empty());
    }

    #[test]
    fn readers_never_observe_partial_writes() {
        let mirror = Arc::new(TreeMirror::new("/a"));
        let wide = (0..64).map(|i| format!("/a/n{i}")).collect::<Vec<_>>();

        let writer = {
            let mirror = mirror.clone();
            let wide = wide.clone();
            thread::spawn(move || {
                for round in 0..500 {
                    let children = if round % 2 == 0 { wide.clone() } else { vec![] };
                    mirror.replace_entry("/a", children);
                }
            })
        };

        let readers = (0..4)
            .map(|_| {
                let mirror = mirror.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = mirror.snapshot();
                        let listed = snapshot.children_of("/a").len();
                        assert!(listed == 0 || listed == 64);
                        assert_eq!(snapshot.counts.direct, listed);
                        let total: usize = snapshot.entries.values().map(Vec::len).sum();
                        assert_eq!(snapshot.counts.all, total - 1);
                    }
                })
            })
            .collect::<Vec<_>>();

        writer.join().expect("writer panicked");
        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}
