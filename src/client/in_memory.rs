use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use snafu::Snafu;
use tracing::{debug, info};

use crate::client::client::{ConnectionSnafu, NodeNotFoundSnafu};
use crate::client::{ClientError, EventType, Notifications, RemoteTreeClient, WatchEvent};
use crate::mirror::{is_valid_path, parent_of};

const NAMESPACE_ROOT: &str = "/";

/// Single-session coordination service kept in process memory.
///
/// Watches behave like the real service: each query arms one watch, each watch fires at
/// most once and is consumed by firing. Cloning yields another handle to the same
/// namespace and session.
#[derive(Debug, Clone)]
pub struct InMemoryEnsemble {
    state: Arc<Mutex<EnsembleState>>,
}

#[derive(Debug)]
struct EnsembleState {
    /// Path to child names, in creation order.
    nodes: HashMap<String, Vec<String>>,
    exists_watches: HashSet<String>,
    children_watches: HashSet<String>,
    faults: HashSet<String>,
    notifier: Option<UnboundedSender<WatchEvent>>,
}

impl EnsembleState {
    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.notifier.is_none() {
            return ConnectionSnafu {
                reason: "session closed",
            }
            .fail();
        }
        Ok(())
    }

    fn ensure_healthy(&self, path: &str) -> Result<(), ClientError> {
        self.ensure_open()?;
        if self.faults.contains(path) {
            return ConnectionSnafu {
                reason: format!("injected fault on '{path}'"),
            }
            .fail();
        }
        Ok(())
    }

    fn fire(&mut self, event_type: EventType, path: &str) {
        let event = WatchEvent::new(event_type, path);
        debug!("Firing watch: {}", event);
        if let Some(notifier) = &self.notifier {
            if let Err(send_err) = notifier.unbounded_send(event) {
                debug!("Failed to deliver watch event: {}", send_err);
            }
        }
    }
}

impl InMemoryEnsemble {
    /// Opens a session against the given ensemble addresses.
    pub fn connect(servers: &[String]) -> Result<(Self, Notifications), ClientError> {
        if servers.is_empty() {
            return ConnectionSnafu {
                reason: "no ensemble servers configured",
            }
            .fail();
        }
        info!("Opening session against ensemble {}", servers.join(","));

        let (notifier, notifications) = mpsc::unbounded();
        let mut nodes = HashMap::new();
        nodes.insert(NAMESPACE_ROOT.to_string(), Vec::new());

        let state = EnsembleState {
            nodes,
            exists_watches: HashSet::new(),
            children_watches: HashSet::new(),
            faults: HashSet::new(),
            notifier: Some(notifier),
        };

        Ok((
            InMemoryEnsemble {
                state: Arc::new(Mutex::new(state)),
            },
            notifications,
        ))
    }

    pub fn create(&self, path: &str) -> Result<(), EnsembleError> {
        let mut state = self.state.lock();
        if state.notifier.is_none() {
            return SessionClosedSnafu.fail();
        }
        if !is_valid_path(path) {
            return InvalidPathSnafu { path }.fail();
        }
        if state.nodes.contains_key(path) {
            return NodeExistsSnafu { path }.fail();
        }
        let Some(parent) = parent_of(path).filter(|parent| state.nodes.contains_key(*parent))
        else {
            return NoParentSnafu { path }.fail();
        };
        let parent = parent.to_string();
        let name = path[parent.len()..].trim_start_matches('/').to_string();

        state.nodes.insert(path.to_string(), Vec::new());
        if let Some(children) = state.nodes.get_mut(&parent) {
            children.push(name);
        }
        debug!("Created '{}'", path);

        if state.exists_watches.remove(path) {
            state.fire(EventType::NodeCreated, path);
        }
        if state.children_watches.remove(&parent) {
            state.fire(EventType::NodeChildrenChanged, &parent);
        }
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<(), EnsembleError> {
        let mut state = self.state.lock();
        if state.notifier.is_none() {
            return SessionClosedSnafu.fail();
        }
        let Some(children) = state.nodes.get(path) else {
            return NoNodeSnafu { path }.fail();
        };
        if !children.is_empty() {
            return NotEmptySnafu { path }.fail();
        }
        let Some(parent) = parent_of(path).map(str::to_string) else {
            return InvalidPathSnafu { path }.fail();
        };

        state.nodes.remove(path);
        let name = path[parent.len()..].trim_start_matches('/');
        if let Some(siblings) = state.nodes.get_mut(&parent) {
            siblings.retain(|sibling| sibling != name);
        }
        debug!("Deleted '{}'", path);

        let exists_armed = state.exists_watches.remove(path);
        let children_armed = state.children_watches.remove(path);
        if exists_armed || children_armed {
            state.fire(EventType::NodeDeleted, path);
        }
        if state.children_watches.remove(&parent) {
            state.fire(EventType::NodeChildrenChanged, &parent);
        }
        Ok(())
    }

    /// Ends the session: the notification stream terminates and all later queries fail.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.notifier.take().is_some() {
            info!("Session closed");
        }
        state.exists_watches.clear();
        state.children_watches.clear();
    }

    #[cfg(test)]
    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(path)
    }

    #[cfg(test)]
    pub fn has_exists_watch(&self, path: &str) -> bool {
        self.state.lock().exists_watches.contains(path)
    }

    #[cfg(test)]
    pub fn has_children_watch(&self, path: &str) -> bool {
        self.state.lock().children_watches.contains(path)
    }

    /// Makes every query on `path` fail with a connection error until cleared.
    #[cfg(test)]
    pub fn inject_fault(&self, path: &str) {
        self.state.lock().faults.insert(path.to_string());
    }

    #[cfg(test)]
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }
}

impl RemoteTreeClient for InMemoryEnsemble {
    async fn exists_with_watch(&self, path: &str) -> Result<bool, ClientError> {
        let mut state = self.state.lock();
        state.ensure_healthy(path)?;
        state.exists_watches.insert(path.to_string());
        Ok(state.nodes.contains_key(path))
    }

    async fn children_with_watch(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let mut state = self.state.lock();
        state.ensure_healthy(path)?;
        let Some(children) = state.nodes.get(path).cloned() else {
            return NodeNotFoundSnafu { path }.fail();
        };
        state.children_watches.insert(path.to_string());
        Ok(children)
    }
}

#[derive(Debug, Snafu)]
pub enum EnsembleError {
    #[snafu(display("'{}' is not a valid absolute path", path))]
    InvalidPathError { path: String },
    #[snafu(display("Node '{}' already exists", path))]
    NodeExistsError { path: String },
    #[snafu(display("Parent of '{}' does not exist", path))]
    NoParentError { path: String },
    #[snafu(display("Node '{}' does not exist", path))]
    NoNodeError { path: String },
    #[snafu(display("Node '{}' still has children", path))]
    NotEmptyError { path: String },
    #[snafu(display("Session is closed"))]
    SessionClosedError,
}
