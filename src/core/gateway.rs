//! Command Gateway
//!
//! Synchronous send-and-wait primitive on top of the transport. A caller
//! claims a wait slot keyed by the response ID it expects, transmits the
//! request under the transport lock, and then parks on the slot's signal
//! until the receiver delivers the matching response, the timeout fires, or
//! the waiters are aborted by a power drop.
//!
//! Correlation is by command ID only, so only one synchronous wait per
//! response ID may be pending at a time.

use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex},
    mutex::Mutex,
    signal::Signal,
};
use embassy_time::{with_timeout, Duration};

use crate::core::{memory::CommandBuffer, protocol::CommandId, transport::HalTx};

/// Maximum number of concurrently pending synchronous calls
pub const MAX_SYNC_WAITERS: usize = 8;

/// How long a synchronous call waits for its response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Block until a response or an abort arrives
    Forever,
    /// Give up after the duration
    After(Duration),
}

impl Timeout {
    pub const fn from_millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }
}

/// Gateway errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GatewayError {
    /// A synchronous wait for the same response ID is already pending
    Busy,
    /// Transport write failed
    SendFailed,
    /// No correlated response within the timeout
    Timeout,
    /// Waiters were aborted
    Canceled,
}

enum Completion {
    Response(CommandBuffer),
    Aborted,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Waiting(CommandId),
    /// Completion posted, waiter not yet released
    Done(CommandId),
}

struct TxState<T> {
    hal: T,
    seq_id: u8,
    trans_id: u16,
}

/// Synchronous command gateway over a transmit transport
pub struct Gateway<T: HalTx> {
    tx: Mutex<CriticalSectionRawMutex, TxState<T>>,
    slots: BlockingMutex<CriticalSectionRawMutex, RefCell<[Slot; MAX_SYNC_WAITERS]>>,
    signals: [Signal<CriticalSectionRawMutex, Completion>; MAX_SYNC_WAITERS],
}

/// Releases a claimed slot on every exit path of `send`
struct SlotGuard<'a, T: HalTx> {
    gateway: &'a Gateway<T>,
    index: usize,
}

impl<T: HalTx> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        self.gateway.release(self.index);
    }
}

impl<T: HalTx> Gateway<T> {
    pub fn new(hal: T) -> Self {
        Self {
            tx: Mutex::new(TxState {
                hal,
                seq_id: 0,
                trans_id: 0,
            }),
            slots: BlockingMutex::new(RefCell::new([Slot::Free; MAX_SYNC_WAITERS])),
            signals: core::array::from_fn(|_| Signal::new()),
        }
    }

    /// Send `request` and wait for its response
    ///
    /// The response payload is copied into `response`, truncated to its
    /// length. Returns the untruncated payload length of the received frame.
    pub async fn send(
        &self,
        request: &mut CommandBuffer,
        response: &mut [u8],
        timeout: Timeout,
    ) -> Result<usize, GatewayError> {
        let expected = request.cmd_id().to_response();
        let index = self.claim(expected)?;
        let _guard = SlotGuard { gateway: self, index };

        self.transmit(request).await?;

        let completion = match timeout {
            Timeout::Forever => self.signals[index].wait().await,
            Timeout::After(duration) => with_timeout(duration, self.signals[index].wait())
                .await
                .map_err(|_| {
                    warn!("Gateway: no response for {:?} within timeout", expected);
                    GatewayError::Timeout
                })?,
        };

        match completion {
            Completion::Response(frame) => {
                let payload = frame.payload();
                let copied = payload.len().min(response.len());
                response[..copied].copy_from_slice(&payload[..copied]);
                Ok(payload.len())
            }
            Completion::Aborted => {
                debug!("Gateway: wait for {:?} aborted", expected);
                Err(GatewayError::Canceled)
            }
        }
    }

    /// Send `request` without waiting; the buffer is released afterwards
    pub async fn post(&self, mut request: CommandBuffer) -> Result<(), GatewayError> {
        self.transmit(&mut request).await
    }

    /// Hand a received frame to the synchronous caller waiting for its ID
    ///
    /// The frame is given back when nobody waits for it.
    pub fn deliver(&self, frame: CommandBuffer) -> Result<(), CommandBuffer> {
        let id = frame.cmd_id();
        let index = self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let index = slots.iter().position(|slot| *slot == Slot::Waiting(id))?;
            slots[index] = Slot::Done(id);
            Some(index)
        });

        match index {
            Some(index) => {
                self.signals[index].signal(Completion::Response(frame));
                Ok(())
            }
            None => Err(frame),
        }
    }

    /// Whether a synchronous caller waits for `id`
    pub fn is_waiting(&self, id: CommandId) -> bool {
        self.slots
            .lock(|slots| slots.borrow().iter().any(|slot| *slot == Slot::Waiting(id)))
    }

    /// Wake every pending synchronous caller with `Canceled`
    pub fn abort_waiters(&self) -> usize {
        let mut aborted = 0;
        self.slots.lock(|slots| {
            for (index, slot) in slots.borrow_mut().iter_mut().enumerate() {
                if let Slot::Waiting(id) = *slot {
                    *slot = Slot::Done(id);
                    self.signals[index].signal(Completion::Aborted);
                    aborted += 1;
                }
            }
        });
        if aborted > 0 {
            info!("Gateway: aborted {} pending waits", aborted);
        }
        aborted
    }

    fn claim(&self, id: CommandId) -> Result<usize, GatewayError> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let duplicate = slots
                .iter()
                .any(|slot| matches!(*slot, Slot::Waiting(pending) | Slot::Done(pending) if pending == id));
            if duplicate {
                warn!("Gateway: wait for {:?} already pending", id);
                return Err(GatewayError::Busy);
            }

            let index = slots.iter().position(|slot| *slot == Slot::Free).ok_or_else(|| {
                warn!("Gateway: no free wait slot");
                GatewayError::Busy
            })?;
            slots[index] = Slot::Waiting(id);
            self.signals[index].reset();
            Ok(index)
        })
    }

    fn release(&self, index: usize) {
        self.slots.lock(|slots| {
            slots.borrow_mut()[index] = Slot::Free;
            // Drops a response that raced with a timeout
            self.signals[index].reset();
        });
    }

    async fn transmit(&self, frame: &mut CommandBuffer) -> Result<(), GatewayError> {
        let mut tx = self.tx.lock().await;

        let seq_id = tx.seq_id;
        let trans_id = tx.trans_id;
        tx.seq_id = seq_id.wrapping_add(1);
        tx.trans_id = trans_id.wrapping_add(1);
        frame.seal(seq_id, trans_id);

        trace!("Gateway: TX {:?} ({} bytes)", frame.cmd_id(), frame.len());
        tx.hal.send(frame.as_slice()).await.map_err(|_| {
            error!("Gateway: transport write failed for {:?}", frame.cmd_id());
            GatewayError::SendFailed
        })
    }
}
