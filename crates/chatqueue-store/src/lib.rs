//! # ChatQueue Store
//!
//! Maps a conversation identifier to a serialized queue snapshot over a
//! pluggable key-value backend, including the one-time migration of the
//! legacy single-slot format.
//!
//! Storage failures never block in-memory operation: the live queue stays
//! authoritative and errors are routed to a caller-supplied callback.

pub mod error;
pub mod kv;
pub mod snapshot;

pub use error::{StoreError, StoreErrorKind};
pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use snapshot::{ErrorCallback, SnapshotStore};
