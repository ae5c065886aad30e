use std::sync::Arc;

use clap::ValueEnum;
use futures::{Stream, StreamExt};
use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info, warn};

use crate::client::{ClientError, RemoteTreeClient, WatchEvent};
use crate::mirror::{AggregateCounts, TreeMirror};
use crate::presentation::{MirrorUpdate, UpdateSender, Visibility};
use crate::sync::walker::{SnapshotWalker, WalkOutcome};

/// How far below a changed node watches are re-armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RearmDepth {
    /// Re-query the changed node and pre-arm one level below it.
    #[default]
    Shallow,
    /// Walk every subtree that is not mirrored yet.
    Full,
}

/// Keeps a [`TreeMirror`] in step with the remote namespace.
///
/// [`start`](Self::start) takes the initial snapshot, [`run`](Self::run) then consumes
/// watch notifications one at a time until the session ends. All mirror writes happen
/// on the task driving the engine.
pub struct SyncEngine<C> {
    pub(super) client: C,
    pub(super) mirror: Arc<TreeMirror>,
    updates: UpdateSender,
    pub(super) rearm: RearmDepth,
}

impl<C: RemoteTreeClient> SyncEngine<C> {
    pub fn new(
        client: C,
        mirror: Arc<TreeMirror>,
        updates: UpdateSender,
        rearm: RearmDepth,
    ) -> Self {
        SyncEngine {
            client,
            mirror,
            updates,
            rearm,
        }
    }

    pub fn mirror(&self) -> &Arc<TreeMirror> {
        &self.mirror
    }

    pub(super) fn root(&self) -> &str {
        self.mirror.root()
    }

    /// Arms the root existence watch and, if the root is there, snapshots its subtree.
    ///
    /// Failing to reach the service here is fatal: no mirror is built.
    pub async fn start(&self) -> Result<(), SyncError> {
        let root = self.root().to_string();
        let exists = self
            .client
            .exists_with_watch(&root)
            .await
            .context(StartupSnafu { root: root.clone() })?;

        if !exists {
            info!("Watched root '{}' does not exist yet", root);
            self.publish(Visibility::Hidden);
            self.publish(self.mirror.counts());
            return Ok(());
        }

        self.publish(Visibility::Shown);
        let counts = self.snapshot(&root).await;
        info!("Initial snapshot of '{}' complete. {}", root, counts);
        self.publish(counts);
        Ok(())
    }

    /// Processes notifications in delivery order until the stream ends.
    pub async fn run(&self, mut notifications: impl Stream<Item = WatchEvent> + Unpin) {
        info!("Watching '{}' for changes", self.root());

        while let Some(event) = notifications.next().await {
            debug!("Event: {}", event);
            self.handle_event(event).await;
            self.revisit_unwatched().await;
        }

        info!("Notification stream ended, stopping reconciliation");
    }

    /// Walks `start` and installs everything found in one write.
    pub(super) async fn snapshot(&self, start: &str) -> AggregateCounts {
        let outcome = SnapshotWalker::new(&self.client).walk(start).await;
        self.install(outcome)
    }

    pub(super) fn install(&self, outcome: WalkOutcome) -> AggregateCounts {
        let counts = self.mirror.replace_entries(outcome.entries);
        for failure in outcome.failures {
            self.mirror.mark_unwatched(failure.path);
        }
        counts
    }

    /// Retries nodes whose children watch could not be armed earlier.
    ///
    /// Only called after an event was handled; there is no polling of its own.
    pub async fn revisit_unwatched(&self) {
        let pending = self.mirror.unwatched();
        if pending.is_empty() {
            return;
        }
        debug!("Revisiting {} unwatched nodes", pending.len());

        let mut repaired = None;
        for path in pending {
            let outcome = SnapshotWalker::new(&self.client).walk(&path).await;
            if outcome.entries.is_empty() {
                match outcome.failures.first() {
                    Some(failure) if failure.source.is_connection_loss() => {
                        debug!("'{}' is still unreachable", path);
                        break;
                    }
                    _ => {
                        debug!("'{}' no longer exists, dropping it", path);
                        self.mirror.clear_unwatched(&path);
                    }
                }
                continue;
            }

            info!("Re-armed watches below '{}'", path);
            repaired = Some(self.install(outcome));
        }

        if let Some(counts) = repaired {
            self.publish(counts);
        }
    }

    /// Reports a failed query. Nodes lost to a connection problem are kept for a revisit.
    pub(super) fn record_failure(&self, path: &str, error: &ClientError) {
        match error {
            ClientError::NodeNotFoundError { .. } => {
                warn!("Skipping '{}': {}", path, error);
            }
            ClientError::ConnectionError { .. } => {
                error!("Watch on '{}' is not armed: {}", path, error);
                self.mirror.mark_unwatched(path);
            }
        }
    }

    pub(super) fn publish(&self, update: impl Into<MirrorUpdate>) {
        let update = update.into();
        debug!("Publishing update: {}", update);
        if let Err(send_err) = self.updates.unbounded_send(update) {
            debug!("Failed to publish update: {}", send_err);
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SyncError {
    #[snafu(display("Failed to check whether the watched root '{}' exists", root))]
    StartupError { root: String, source: ClientError },
}
