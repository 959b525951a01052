//! Core library for the Nexus CRM dashboard.
//!
//! The centre of the crate is the local-first [`cache::CacheManager`]: views
//! read from a durable local snapshot immediately, fetch from the hosted
//! backend through [`api::RemoteClient`] when they can, and hand the results
//! back to the cache to reconcile. Local edits and deletions always survive a
//! sync.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod stats;
pub mod utils;

pub use cache::{CacheManager, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use config::Config;
