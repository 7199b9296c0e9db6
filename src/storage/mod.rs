//! Storage collaborators: entity persistence and blob storage
//!
//! Both are trait seams with in-memory reference backends; the engine never
//! talks to a concrete database directly.

mod blobs;
mod persistence;

pub use blobs::{BlobError, BlobStore, InMemoryBlobStore};
pub use persistence::{InMemoryStore, Persistence, PersistenceError};
