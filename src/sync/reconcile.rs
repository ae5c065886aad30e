use tracing::{debug, info};

use crate::client::{EventType, RemoteTreeClient, WatchEvent};
use crate::mirror::{AggregateCounts, join_child};
use crate::presentation::Visibility;
use crate::sync::engine::{RearmDepth, SyncEngine};
use crate::sync::walker::SnapshotWalker;

impl<C: RemoteTreeClient> SyncEngine<C> {
    /// Applies one fired watch to the mirror and re-arms what it consumed.
    ///
    /// Query failures are reported and never abort the caller.
    pub async fn handle_event(&self, event: WatchEvent) {
        match event.event_type {
            EventType::NodeCreated if event.path == self.root() => self.on_root_created().await,
            EventType::NodeDeleted if event.path == self.root() => self.on_root_deleted().await,
            EventType::NodeChildrenChanged => self.on_children_changed(&event.path).await,
            EventType::NodeCreated | EventType::NodeDeleted => {
                debug!("Ignoring '{}', only the root existence is tracked", event);
            }
        }
    }

    async fn on_root_created(&self) {
        let root = self.root().to_string();
        match self.client.exists_with_watch(&root).await {
            Ok(true) => self.show_root().await,
            Ok(false) => debug!("Root '{}' is gone again, waiting for the next creation", root),
            Err(error) => self.record_failure(&root, &error),
        }
    }

    async fn on_root_deleted(&self) {
        let root = self.root().to_string();
        info!("Watched root '{}' was deleted", root);
        self.publish(Visibility::Hidden);
        let counts = self.mirror.reset();
        self.publish(counts);

        match self.client.exists_with_watch(&root).await {
            Ok(false) => {}
            Ok(true) => {
                // The creation happened before the watch was back in place, so no event
                // will ever report it.
                info!("Root '{}' was recreated before its watch was re-armed", root);
                self.show_root().await;
            }
            Err(error) => self.record_failure(&root, &error),
        }
    }

    /// Root exists and its existence watch is armed.
    async fn show_root(&self) {
        let root = self.root().to_string();
        info!("Watched root '{}' is present", root);
        self.publish(Visibility::Shown);

        let counts = match self.rearm {
            RearmDepth::Shallow => self.refresh(&root).await,
            RearmDepth::Full => {
                self.mirror.reset();
                Some(self.snapshot(&root).await)
            }
        };
        if let Some(counts) = counts {
            self.publish(counts);
        }
    }

    async fn on_children_changed(&self, path: &str) {
        if let Some(counts) = self.refresh(path).await {
            debug!("Children of '{}' reconciled. {}", path, counts);
            self.publish(counts);
        }
    }

    /// Re-queries `path`, re-arms below it and stores its new child list.
    async fn refresh(&self, path: &str) -> Option<AggregateCounts> {
        let names = match self.client.children_with_watch(path).await {
            Ok(names) => names,
            Err(error) => {
                self.record_failure(path, &error);
                return None;
            }
        };
        let children = names
            .iter()
            .map(|name| join_child(path, name))
            .collect::<Vec<_>>();

        let counts = match self.rearm {
            RearmDepth::Shallow => {
                self.prearm(&children).await;
                self.mirror.replace_entry(path, children)
            }
            RearmDepth::Full => {
                let unwatched = self.mirror.unwatched();
                let (known, fresh): (Vec<String>, Vec<String>) =
                    children.iter().cloned().partition(|child| {
                        self.mirror.is_branch(child) && !unwatched.contains(child)
                    });
                self.prearm(&known).await;

                let outcome = SnapshotWalker::new(&self.client).walk_all(fresh).await;
                let mut entries = vec![(path.to_string(), children)];
                entries.extend(outcome.entries);
                let counts = self.mirror.replace_entries(entries);
                for failure in outcome.failures {
                    self.mirror.mark_unwatched(failure.path);
                }
                counts
            }
        };
        Some(counts)
    }

    /// Arms a children watch on each path without recording what it returns.
    async fn prearm(&self, paths: &[String]) {
        for path in paths {
            if let Err(error) = self.client.children_with_watch(path).await {
                self.record_failure(path, &error);
            }
        }
    }
}
