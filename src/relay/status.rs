//! Status-Change Notification Bus
//!
//! Holds the modem power status and broadcasts every transition to the
//! subscribed handlers. Handlers receive the session context, the command
//! they were subscribed for and both states; returning [`Disposition::Clear`]
//! drops their own subscription.
//!
//! Handlers run outside the bus lock over a snapshot of the subscriber list,
//! so they may call back into the bus or the callback registry.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::Vec;

use crate::core::protocol::CommandId;

/// Maximum number of status subscribers
pub const MAX_STATUS_SUBSCRIBERS: usize = 16;

/// Modem power status, ordered from least to most operational
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ModemStatus {
    Uninitialized = 0,
    Initialized = 1,
    RestartOngoing = 2,
    PowerOn = 3,
}

/// What a handler wants done with its subscription after a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Disposition {
    Keep,
    Clear,
}

/// Status bus errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusError {
    Full,
}

/// Status change handler: `(context, command, new, old) -> disposition`
pub type StatusHandler<C> = fn(&C, CommandId, ModemStatus, ModemStatus) -> Disposition;

/// Caller-chosen identity of a status handler
///
/// Subscriptions are matched by command and handler ID, never by the
/// handler's function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandlerId(pub u16);

impl HandlerId {
    /// Reserved for the relay's own call cancellation handler
    pub const RELAY: Self = Self(0);
}

/// A `(command, handler)` pairing on the bus
pub struct Subscription<C> {
    pub command: CommandId,
    pub id: HandlerId,
    pub handler: StatusHandler<C>,
}

impl<C> Subscription<C> {
    fn is(&self, command: CommandId, id: HandlerId) -> bool {
        self.command == command && self.id == id
    }
}

impl<C> Clone for Subscription<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Subscription<C> {}

/// Publish/subscribe bus for modem status transitions
pub struct StatusBus<C, const N: usize = MAX_STATUS_SUBSCRIBERS> {
    status: Mutex<CriticalSectionRawMutex, Cell<ModemStatus>>,
    subscribers: Mutex<CriticalSectionRawMutex, RefCell<Vec<Subscription<C>, N>>>,
}

impl<C, const N: usize> StatusBus<C, N> {
    pub const fn new() -> Self {
        Self {
            status: Mutex::new(Cell::new(ModemStatus::Uninitialized)),
            subscribers: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    pub fn status(&self) -> ModemStatus {
        self.status.lock(|status| status.get())
    }

    /// Store `new` and return the previous status
    pub fn swap_status(&self, new: ModemStatus) -> ModemStatus {
        self.status.lock(|status| status.replace(new))
    }

    /// Add a subscription; a second one for the same `(command, id)` pairing
    /// is ignored
    pub fn subscribe(&self, command: CommandId, id: HandlerId, handler: StatusHandler<C>) -> Result<(), StatusError> {
        self.subscribers.lock(|subscribers| {
            let mut subscribers = subscribers.borrow_mut();
            if subscribers.iter().any(|entry| entry.is(command, id)) {
                return Ok(());
            }
            subscribers.push(Subscription { command, id, handler }).map_err(|_| {
                error!("STATUS: subscriber list full, dropping {:?}", command);
                StatusError::Full
            })
        })
    }

    /// Remove a subscription; no-op when absent
    pub fn unsubscribe(&self, command: CommandId, id: HandlerId) {
        self.subscribers.lock(|subscribers| {
            subscribers.borrow_mut().retain(|entry| !entry.is(command, id));
        });
    }

    pub fn is_subscribed(&self, command: CommandId, id: HandlerId) -> bool {
        self.subscribers
            .lock(|subscribers| subscribers.borrow().iter().any(|entry| entry.is(command, id)))
    }

    /// Number of subscriptions
    pub fn len(&self) -> usize {
        self.subscribers.lock(|subscribers| subscribers.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every subscriber of `old -> new` in registration order
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, context: &C, new: ModemStatus, old: ModemStatus) -> usize {
        let snapshot = self.subscribers.lock(|subscribers| subscribers.borrow().clone());
        let mut invoked = 0;

        for subscription in snapshot.iter() {
            // Skip entries removed by an earlier handler of this round
            if !self.is_subscribed(subscription.command, subscription.id) {
                continue;
            }
            invoked += 1;
            if (subscription.handler)(context, subscription.command, new, old) == Disposition::Clear {
                self.unsubscribe(subscription.command, subscription.id);
            }
        }

        debug!("STATUS: {:?} -> {:?}, {} handlers", old, new, invoked);
        invoked
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.subscribers.lock(|subscribers| subscribers.borrow_mut().clear());
    }
}

impl<C, const N: usize> Default for StatusBus<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
