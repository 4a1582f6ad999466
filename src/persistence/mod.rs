//! Durable session state.
//!
//! This module provides:
//! - [`PersistedState`], the single JSON document written on every save
//! - [`KeyValueStore`] backends for memory, files and browser localStorage
//! - [`SaveScheduler`], the cancel-and-reschedule debounce timer
//! - [`PersistenceManager`], which ties them together

mod manager;
mod scheduler;
mod state;
mod storage;

pub use manager::PersistenceManager;
pub use scheduler::SaveScheduler;
pub use state::{PersistedState, ResetScope};
pub use storage::{KeyValueStore, MemoryStore, StorageError};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
