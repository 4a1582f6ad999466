//! Load, debounced save and reset of the durable record.

use web_time::Instant;

use super::scheduler::SaveScheduler;
use super::state::{PersistedState, ResetScope};
use super::storage::{KeyValueStore, StorageError};

/// Owner of the storage backend and the save timer.
///
/// Mutations call [`schedule_save`](Self::schedule_save); the host drives
/// [`poll`](Self::poll) from its event loop and the state snapshot is only
/// built when a write actually happens.
pub struct PersistenceManager {
    storage: Box<dyn KeyValueStore>,
    key: String,
    scheduler: SaveScheduler,
}

impl PersistenceManager {
    pub fn new(storage: Box<dyn KeyValueStore>, key: impl Into<String>, scheduler: SaveScheduler) -> Self {
        Self {
            storage,
            key: key.into(),
            scheduler,
        }
    }

    /// Read the durable record.
    ///
    /// Absent, unreadable and malformed records all yield `None`; the latter
    /// two are logged and otherwise ignored.
    pub fn load(&self) -> Option<PersistedState> {
        let json = match self.storage.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => {
                log::debug!("No saved state under '{}'", self.key);
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read saved state: {}", e);
                return None;
            }
        };
        match PersistedState::from_json(&json) {
            Ok(state) => {
                log::info!(
                    "Loaded saved state: {} presets, {} user markers",
                    state.preset_markers.len(),
                    state.user_markers.len()
                );
                Some(state)
            }
            Err(e) => {
                log::warn!("Discarding malformed saved state: {}", e);
                None
            }
        }
    }

    /// The raw stored document, if any.
    pub fn read_raw(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(&self.key)
    }

    /// Cancel any pending save and schedule a new one.
    pub fn schedule_save(&mut self) {
        self.scheduler.schedule();
    }

    /// [`schedule_save`](Self::schedule_save) with an explicit clock reading.
    pub fn schedule_save_at(&mut self, now: Instant) {
        self.scheduler.schedule_at(now);
    }

    pub fn is_save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Write the record if the pending save is due at `now`.
    ///
    /// Returns whether a write happened. A failed write is logged and
    /// rescheduled.
    pub fn poll(&mut self, now: Instant, snapshot: impl FnOnce() -> PersistedState) -> bool {
        if !self.scheduler.take_due_at(now) {
            return false;
        }
        match self.write(&snapshot()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Save failed, will retry: {}", e);
                self.scheduler.schedule_at(now);
                false
            }
        }
    }

    /// Write immediately if a save is pending. Used on shutdown.
    pub fn flush(&mut self, snapshot: impl FnOnce() -> PersistedState) -> Result<bool, StorageError> {
        if !self.scheduler.take_pending() {
            return Ok(false);
        }
        self.write(&snapshot())?;
        Ok(true)
    }

    /// Clear `scope` from `state` and write it at once, dropping any pending
    /// save.
    pub fn reset(&mut self, scope: ResetScope, mut state: PersistedState) -> Result<PersistedState, StorageError> {
        self.scheduler.cancel();
        state.clear(scope);
        self.write(&state)?;
        log::info!("Reset ({}) saved", scope);
        Ok(state)
    }

    /// Overwrite the record wholesale.
    fn write(&mut self, state: &PersistedState) -> Result<(), StorageError> {
        let json = state.to_json()?;
        self.storage.set(&self.key, &json)?;
        log::info!("Saved state ({} bytes)", json.len());
        Ok(())
    }

    /// Hand the backend back, e.g. to reopen it in a new session.
    pub fn into_storage(self) -> Box<dyn KeyValueStore> {
        self.storage
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("key", &self.key)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
