//! Local-first caching module.
//!
//! This module provides the `CacheManager`, which keeps a durable local
//! snapshot of each entity collection and reconciles it with records fetched
//! from the remote backend. The local snapshot is always readable, even when
//! the backend is unreachable, and local intent wins over remote data:
//!
//! - a record edited locally keeps its local fields after a sync
//! - a lead deleted locally is tombstoned and never resurrected by a sync
//! - a tombstone is lifted only by saving a record with the same id again
//!
//! Storage is injected through the `KeyValueStore` trait. `FileStore` keeps
//! one JSON file per key on disk; `MemoryStore` keeps everything in process.

pub mod error;
pub mod keys;
pub mod manager;
pub mod snapshot;
pub mod store;

pub use error::StorageError;
pub use manager::{CacheAges, CacheManager};
pub use snapshot::SnapshotAge;
pub use store::{FileStore, KeyValueStore, MemoryStore};
