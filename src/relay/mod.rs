//! Relay Session
//!
//! [`Altcom`] owns everything a relay session needs: the command gateway, the
//! pending callback registry, the status bus and the job dispatcher. It is
//! created once, initialized before the first API call and shut down
//! explicitly; nothing lives in global state.
//!
//! Firmware drives a session with two long-running loops, typically spawned
//! as separate embassy tasks:
//! - [`Altcom::run_receiver`] drains the receive transport
//! - [`Altcom::run_worker`] runs the jobs that resolve asynchronous calls

pub mod callbacks;
pub mod dispatcher;
pub mod status;

use core::cell::Cell;
use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex},
    signal::Signal,
};
use embassy_time::Timer;

use crate::api::{self, lte::ErrInfo, mbedtls::ContextIdAllocator, ApiCallback};
use crate::config::AltcomConfig;
use crate::core::{
    gateway::Gateway,
    memory::CommandBuffer,
    protocol::CommandId,
    transport::{HalRx, HalTx},
};
use crate::error::{Error, Result};

use callbacks::CallbackRegistry;
use dispatcher::{Dispatcher, FrameOutcome};
use status::{HandlerId, ModemStatus, StatusBus, StatusHandler};

/// A relay session over a modem transport
pub struct Altcom<T: HalTx> {
    pub(crate) gateway: Gateway<T>,
    pub(crate) callbacks: CallbackRegistry<ApiCallback>,
    pub(crate) bus: StatusBus<Altcom<T>>,
    dispatcher: Dispatcher<Altcom<T>>,
    pub(crate) config: AltcomConfig,
    pub(crate) errinfo: BlockingMutex<CriticalSectionRawMutex, Cell<Option<ErrInfo>>>,
    pub(crate) ctx_ids: ContextIdAllocator,
    rx_stop: Signal<CriticalSectionRawMutex, ()>,
    worker_stop: Signal<CriticalSectionRawMutex, ()>,
}

impl<T: HalTx> Altcom<T> {
    pub fn new(tx: T, config: AltcomConfig) -> Self {
        Self {
            gateway: Gateway::new(tx),
            callbacks: CallbackRegistry::new(),
            bus: StatusBus::new(),
            dispatcher: Dispatcher::new(&api::handlers::<T>()),
            config,
            errinfo: BlockingMutex::new(Cell::new(None)),
            ctx_ids: ContextIdAllocator::new(),
            rx_stop: Signal::new(),
            worker_stop: Signal::new(),
        }
    }

    /// Bring the session up; calling it again is a no-op
    pub fn initialize(&self) {
        if self.is_initialized() {
            return;
        }
        self.rx_stop.reset();
        self.worker_stop.reset();
        self.set_status(ModemStatus::Initialized);
        info!("ALTCOM: initialized");
    }

    /// Tear the session down
    ///
    /// Pending synchronous calls fail with `Canceled`, pending asynchronous
    /// callbacks are dropped without being invoked, and both loops return.
    pub fn shutdown(&self) {
        self.set_status(ModemStatus::Uninitialized);
        self.callbacks.clear();
        self.bus.clear();
        let dropped = self.dispatcher.drain();
        if dropped > 0 {
            warn!("ALTCOM: dropped {} queued frames", dropped);
        }
        self.rx_stop.signal(());
        self.worker_stop.signal(());
        info!("ALTCOM: shut down");
    }

    pub fn config(&self) -> &AltcomConfig {
        &self.config
    }

    pub fn status(&self) -> ModemStatus {
        self.bus.status()
    }

    pub fn is_initialized(&self) -> bool {
        self.status() >= ModemStatus::Initialized
    }

    /// Record a modem status transition and notify subscribers
    ///
    /// Dropping below `PowerOn` aborts every pending synchronous wait before
    /// the subscribers run. Returns the previous status.
    pub fn set_status(&self, new: ModemStatus) -> ModemStatus {
        let old = self.bus.swap_status(new);
        if old == new {
            return old;
        }

        info!("ALTCOM: status {:?} -> {:?}", old, new);
        if new < ModemStatus::PowerOn {
            self.gateway.abort_waiters();
        }
        self.bus.publish(self, new, old);
        old
    }

    /// Fail unless the modem is powered on
    pub fn check_poweron_status(&self) -> Result<()> {
        match self.status() {
            ModemStatus::PowerOn => Ok(()),
            ModemStatus::Uninitialized => Err(Error::NotInitialized),
            ModemStatus::Initialized | ModemStatus::RestartOngoing => Err(Error::NotPoweredOn),
        }
    }

    /// Fail unless the session is initialized
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            error!("ALTCOM: not initialized");
            Err(Error::NotInitialized)
        }
    }

    /// Subscribe an extra handler to status transitions
    ///
    /// `HandlerId::RELAY` belongs to the relay and is rejected.
    pub fn subscribe_status(&self, command: CommandId, id: HandlerId, handler: StatusHandler<Self>) -> Result<()> {
        if id == HandlerId::RELAY {
            return Err(Error::InvalidArgument);
        }
        self.bus.subscribe(command, id, handler)?;
        Ok(())
    }

    pub fn unsubscribe_status(&self, command: CommandId, id: HandlerId) {
        if id != HandlerId::RELAY {
            self.bus.unsubscribe(command, id);
        }
    }

    pub fn callbacks(&self) -> &CallbackRegistry<ApiCallback> {
        &self.callbacks
    }

    pub fn status_bus(&self) -> &StatusBus<Self> {
        &self.bus
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// Route one received frame
    ///
    /// Malformed frames are dropped. A frame a synchronous caller waits for is
    /// delivered to it; anything else goes to the job dispatcher.
    pub async fn process_frame(&self, frame: CommandBuffer) -> FrameOutcome {
        let header = match dispatcher::identify(&frame) {
            Ok(header) => header,
            Err(e) => {
                warn!("RX: malformed frame ({} bytes): {:?}", frame.len(), e);
                return FrameOutcome::Malformed;
            }
        };

        trace!("RX: {:?} seq {} ({} bytes)", header.cmd_id, header.seq_id, header.data_len);
        match self.gateway.deliver(frame) {
            Ok(()) => FrameOutcome::Delivered,
            Err(frame) => self.dispatcher.dispatch(frame).await,
        }
    }

    /// Receiver loop: pull frames from the transport until shutdown
    pub async fn run_receiver<R: HalRx>(&self, rx: &mut R) {
        info!("RX: receiver started");

        loop {
            let mut frame = match CommandBuffer::alloc_receive() {
                Ok(frame) => frame,
                Err(_) => {
                    warn!("RX: no buffer for inbound frame, retrying");
                    if self.until_stopped(Timer::after(self.config.rx_retry_delay)).await.is_none() {
                        break;
                    }
                    continue;
                }
            };

            let received = self.until_stopped(rx.receive(frame.receive_space())).await;
            let len = match received {
                Some(Ok(len)) => len,
                Some(Err(_)) => {
                    warn!("RX: transport error, retrying");
                    if self.until_stopped(Timer::after(self.config.rx_retry_delay)).await.is_none() {
                        rx.abort_receive();
                        break;
                    }
                    continue;
                }
                None => {
                    rx.abort_receive();
                    break;
                }
            };

            if frame.set_len(len).is_err() {
                warn!("RX: frame length {} out of range", len);
                continue;
            }

            if self.until_stopped(self.process_frame(frame)).await.is_none() {
                break;
            }
        }

        info!("RX: receiver stopped");
    }

    /// Worker loop: run queued jobs until shutdown
    pub async fn run_worker(&self) {
        info!("WORKER: started");

        loop {
            match select(self.worker_stop.wait(), self.dispatcher.next_job()).await {
                Either::First(()) => break,
                Either::Second((job, frame)) => job(self, frame),
            }
        }

        info!("WORKER: stopped");
    }

    /// Run one queued job without blocking; returns whether one ran
    pub fn run_pending_job(&self) -> bool {
        self.dispatcher.try_run_one(self)
    }

    async fn until_stopped<F: Future>(&self, fut: F) -> Option<F::Output> {
        match select(self.rx_stop.wait(), fut).await {
            Either::First(()) => None,
            Either::Second(output) => Some(output),
        }
    }
}
