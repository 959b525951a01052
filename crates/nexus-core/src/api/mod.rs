//! REST client for the hosted CRM backend.
//!
//! This module provides the `RemoteClient` for reading and writing the
//! backend tables (`leads`, `categories`, `companies`, `tasks`) through
//! their PostgREST interface. Requests carry the project's anon key both as
//! the `apikey` header and as a bearer token.
//!
//! The cache never calls this client itself: callers fetch, then hand the
//! records to `CacheManager::sync`.

pub mod client;
pub mod error;

pub use client::RemoteClient;
pub use error::ApiError;
