//! Watch re-registration and reconciliation.
//!
//! The engine snapshots the watched subtree once, then turns every fired watch into a
//! fresh query that both answers what changed and re-arms the consumed watch.

mod engine;
mod reconcile;
mod walker;

pub use engine::{RearmDepth, SyncEngine, SyncError};
pub use walker::{PartialWalkError, SnapshotWalker, WalkOutcome};
