//! Key-value persistence.
//!
//! Arrival history and favorites are persisted as JSON strings under
//! string keys. The backend is injected, so tests use [`MemoryStore`] and
//! the server uses [`FileStore`].

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

/// A string key-value store.
///
/// Implementations use interior mutability so a single instance can be
/// shared behind an `Arc` by every component that persists state.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}
