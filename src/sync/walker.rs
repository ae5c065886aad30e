use std::collections::VecDeque;

use snafu::Snafu;
use tracing::{debug, warn};

use crate::client::{ClientError, RemoteTreeClient};
use crate::mirror::join_child;

/// Breadth-first traversal that visits every node below a start path, arming a
/// children watch on each node it manages to query.
pub struct SnapshotWalker<'a, C> {
    client: &'a C,
}

/// Entries collected by a walk, in visiting order, and the nodes that could not be
/// queried.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub entries: Vec<(String, Vec<String>)>,
    pub failures: Vec<PartialWalkError>,
}

impl WalkOutcome {
    pub fn failed_paths(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.path.as_str())
    }
}

impl<'a, C: RemoteTreeClient> SnapshotWalker<'a, C> {
    pub fn new(client: &'a C) -> Self {
        SnapshotWalker { client }
    }

    pub async fn walk(&self, start: &str) -> WalkOutcome {
        self.walk_all([start.to_string()]).await
    }

    /// Walks every subtree rooted at `starts`.
    ///
    /// A failed node is reported and treated as childless; the walk goes on with the
    /// rest of the queue.
    pub async fn walk_all(&self, starts: impl IntoIterator<Item = String>) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let mut queue = starts.into_iter().collect::<VecDeque<_>>();

        while let Some(path) = queue.pop_front() {
            match self.client.children_with_watch(&path).await {
                Ok(names) => {
                    let children = names
                        .iter()
                        .map(|name| join_child(&path, name))
                        .collect::<Vec<_>>();
                    debug!("Visited '{}' with {} children", path, children.len());
                    queue.extend(children.iter().cloned());
                    outcome.entries.push((path, children));
                }
                Err(source) => {
                    let failure = PartialWalkError { path, source };
                    warn!("{}: {}", failure, failure.source);
                    outcome.failures.push(failure);
                }
            }
        }

        outcome
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Failed to query children of '{}' during the walk", path))]
pub struct PartialWalkError {
    pub path: String,
    pub source: ClientError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryEnsemble;

    fn ensemble_with(paths: &[&str]) -> InMemoryEnsemble {
        let (ensemble, _notifications) =
            InMemoryEnsemble::connect(&["127.0.0.1:2181".to_string()]).unwrap();
        for path in paths {
            ensemble.create(path).unwrap();
        }
        ensemble
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[compio::test]
    async fn walk_visits_every_node_breadth_first() {
        let ensemble = ensemble_with(&["/a", "/a/b", "/a/c", "/a/b/d"]);

        let outcome = SnapshotWalker::new(&ensemble).walk("/a").await;

        assert!(outcome.failures.is_empty());
        assert_eq!(
            outcome.entries,
            vec![
                ("/a".to_string(), owned(&["/a/b", "/a/c"])),
                ("/a/b".to_string(), owned(&["/a/b/d"])),
                ("/a/c".to_string(), vec![]),
                ("/a/b/d".to_string(), vec![]),
            ]
        );
        for path in ["/a", "/a/b", "/a/c", "/a/b/d"] {
            assert!(ensemble.has_children_watch(path), "no watch on {path}");
        }
    }

    #[compio::test]
    async fn failed_node_is_reported_and_walk_continues() {
        let ensemble = ensemble_with(&["/a", "/a/b", "/a/c", "/a/b/d", "/a/c/e"]);
        ensemble.inject_fault("/a/b");

        let outcome = SnapshotWalker::new(&ensemble).walk("/a").await;

        assert_eq!(outcome.failed_paths().collect::<Vec<_>>(), vec!["/a/b"]);
        assert!(outcome.entries.iter().all(|(path, _)| path != "/a/b"));
        assert!(outcome.entries.iter().any(|(path, _)| path == "/a/c/e"));
        assert!(!ensemble.has_children_watch("/a/b"));
        assert!(!ensemble.has_children_watch("/a/b/d"));
    }

    #[compio::test]
    async fn walking_missing_start_reports_not_found() {
        let ensemble = ensemble_with(&[]);

        let outcome = SnapshotWalker::new(&ensemble).walk("/a").await;

        assert!(outcome.entries.is_empty());
        assert!(matches!(
            outcome.failures[0].source,
            ClientError::NodeNotFoundError { .. }
        ));
    }
}
