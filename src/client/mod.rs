//! Access to the coordination service.
//!
//! The sync engine only depends on [`RemoteTreeClient`] and a stream of
//! [`WatchEvent`]s. [`InMemoryEnsemble`] is the in-process implementation used by the
//! CLI and by the tests.

mod client;
mod in_memory;

pub use client::{ClientError, EventType, Notifications, RemoteTreeClient, WatchEvent};
pub use in_memory::{EnsembleError, InMemoryEnsemble};
