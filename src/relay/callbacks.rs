//! Pending Callback Registry
//!
//! Maps a command ID to the callback of its outstanding asynchronous call.
//! At most one entry per command ID exists at any time, which is what keeps
//! command-ID-only correlation unambiguous. Every operation runs inside one
//! critical section, so no context observes a half-updated table.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::index_map::FnvIndexMap;

use crate::core::protocol::CommandId;

/// Maximum number of outstanding asynchronous calls (power of two)
pub const MAX_PENDING_CALLBACKS: usize = 32;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// A callback for this command ID is already registered
    Busy,
    /// No room for another entry
    Full,
}

/// Command ID → callback table
pub struct CallbackRegistry<C: Copy, const N: usize = MAX_PENDING_CALLBACKS> {
    entries: Mutex<CriticalSectionRawMutex, RefCell<FnvIndexMap<CommandId, C, N>>>,
}

impl<C: Copy, const N: usize> CallbackRegistry<C, N> {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// Register `callback` for `id`, failing if one is already outstanding
    pub fn register(&self, id: CommandId, callback: C) -> Result<(), RegistryError> {
        self.entries.lock(|entries| {
            let mut entries = entries.borrow_mut();
            if entries.contains_key(&id) {
                debug!("CALLBACKS: {:?} already registered", id);
                return Err(RegistryError::Busy);
            }
            entries.insert(id, callback).map_err(|_| {
                error!("CALLBACKS: table full, cannot register {:?}", id);
                RegistryError::Full
            })?;
            Ok(())
        })
    }

    /// Install `callback` for `id`, swapping out any previous one in the same
    /// critical section
    pub fn replace(&self, id: CommandId, callback: C) -> Result<Option<C>, RegistryError> {
        self.entries.lock(|entries| {
            entries.borrow_mut().insert(id, callback).map_err(|_| {
                error!("CALLBACKS: table full, cannot register {:?}", id);
                RegistryError::Full
            })
        })
    }

    /// Take the callback registered for `id`, clearing the entry
    pub fn consume(&self, id: CommandId) -> Option<C> {
        self.entries.lock(|entries| entries.borrow_mut().remove(&id))
    }

    /// Clear the entry for `id` without invoking it; no-op when absent
    pub fn unregister(&self, id: CommandId) {
        if self.consume(id).is_some() {
            debug!("CALLBACKS: unregistered {:?}", id);
        }
    }

    /// Look at the callback for `id` without clearing it
    pub fn get(&self, id: CommandId) -> Option<C> {
        self.entries.lock(|entries| entries.borrow().get(&id).copied())
    }

    pub fn is_registered(&self, id: CommandId) -> bool {
        self.entries.lock(|entries| entries.borrow().contains_key(&id))
    }

    pub fn len(&self) -> usize {
        self.entries.lock(|entries| entries.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock(|entries| entries.borrow_mut().clear());
    }
}

impl<C: Copy, const N: usize> Default for CallbackRegistry<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
