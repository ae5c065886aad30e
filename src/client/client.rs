use derive_more::Display;
use futures_channel::mpsc::UnboundedReceiver;
use snafu::Snafu;

/// Stream of watch notifications delivered by a session.
pub type Notifications = UnboundedReceiver<WatchEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventType {
    NodeCreated,
    NodeDeleted,
    NodeChildrenChanged,
}

/// A fired one-shot watch.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{event_type} {path}")]
pub struct WatchEvent {
    pub event_type: EventType,
    pub path: String,
}

impl WatchEvent {
    pub fn new(event_type: EventType, path: impl Into<String>) -> Self {
        WatchEvent {
            event_type,
            path: path.into(),
        }
    }
}

/// Queries against the remote namespace.
///
/// Every successful call also (re-)arms exactly one one-shot watch on `path`: an
/// existence watch for [`exists_with_watch`](Self::exists_with_watch) and a children
/// watch for [`children_with_watch`](Self::children_with_watch). The read and the arm are
/// atomic, so no change can slip in between them unobserved.
pub trait RemoteTreeClient {
    async fn exists_with_watch(&self, path: &str) -> Result<bool, ClientError>;

    /// Child names (not full paths) in the order the service returns them.
    async fn children_with_watch(&self, path: &str) -> Result<Vec<String>, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Node '{}' does not exist", path))]
    NodeNotFoundError { path: String },
    #[snafu(display("Session to the ensemble is unusable: {}", reason))]
    ConnectionError { reason: String },
}

impl ClientError {
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, ClientError::ConnectionError { .. })
    }
}
