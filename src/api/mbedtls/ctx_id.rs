//! Context ID allocation
//!
//! IDs are handed out per context kind, starting at 0, and name the matching
//! object on the modem.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::core::transport::HalTx;
use crate::relay::Altcom;

/// Kinds of modem-side mbedTLS objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContextKind {
    Ssl = 0,
    SslConfig = 1,
    Pk = 2,
    Cipher = 3,
}

const KIND_COUNT: usize = 4;

/// Per-kind context ID counters
pub struct ContextIdAllocator {
    next: Mutex<CriticalSectionRawMutex, Cell<[u32; KIND_COUNT]>>,
}

impl ContextIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(Cell::new([0; KIND_COUNT])),
        }
    }

    /// Next ID for `kind`
    pub fn allocate(&self, kind: ContextKind) -> u32 {
        self.next.lock(|next| {
            let mut ids = next.get();
            let id = ids[kind as usize];
            ids[kind as usize] = id.wrapping_add(1);
            next.set(ids);
            id
        })
    }
}

impl Default for ContextIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HalTx> Altcom<T> {
    pub fn context_ids(&self) -> &ContextIdAllocator {
        &self.ctx_ids
    }
}
