//! Event/Job Dispatcher
//!
//! Classifies inbound frames and queues the job registered for their command
//! ID. Jobs run on the worker context, never on the receiver, and own the
//! frame they are given: the pool slot is released when the job returns.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use heapless::Vec;

use crate::core::{
    memory::CommandBuffer,
    protocol::{CommandHeader, CommandId, ProtocolError},
};

/// Maximum number of registered job handlers
pub const MAX_HANDLERS: usize = 16;

/// Frames waiting for the worker
pub const JOB_QUEUE_DEPTH: usize = 8;

/// Job resolving an inbound frame: `(context, frame)`
pub type Job<C> = fn(&C, CommandBuffer);

/// What happened to an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// Handed to a waiting synchronous caller
    Delivered,
    /// Queued for the worker
    Dispatched,
    /// No job for this command ID; frame dropped
    Unsupported,
    /// Header or length invalid; frame dropped
    Malformed,
}

/// Validate the header of a received frame against its actual length
pub fn identify(frame: &CommandBuffer) -> Result<CommandHeader, ProtocolError> {
    let header = frame.header()?;
    if header.frame_len() != frame.len() {
        return Err(ProtocolError::InvalidLength);
    }
    Ok(header)
}

/// Command ID → job table plus the worker queue
pub struct Dispatcher<C> {
    handlers: Vec<(CommandId, Job<C>), MAX_HANDLERS>,
    queue: Channel<CriticalSectionRawMutex, (Job<C>, CommandBuffer), JOB_QUEUE_DEPTH>,
}

impl<C> Dispatcher<C> {
    /// Build a dispatcher from `(command, job)` pairs; later duplicates are ignored
    pub fn new(handlers: &[(CommandId, Job<C>)]) -> Self {
        let mut table = Vec::new();
        for &(id, job) in handlers {
            if table.iter().any(|(known, _)| *known == id) {
                warn!("DISPATCH: duplicate handler for {:?}", id);
                continue;
            }
            if table.push((id, job)).is_err() {
                error!("DISPATCH: handler table full, {:?} not registered", id);
            }
        }

        Self {
            handlers: table,
            queue: Channel::new(),
        }
    }

    /// Job registered for `id`
    pub fn find(&self, id: CommandId) -> Option<Job<C>> {
        self.handlers
            .iter()
            .find(|(known, _)| *known == id)
            .map(|&(_, job)| job)
    }

    pub fn supports(&self, id: CommandId) -> bool {
        self.find(id).is_some()
    }

    /// Queue `frame` for its job, waiting for room in the queue
    pub async fn dispatch(&self, frame: CommandBuffer) -> FrameOutcome {
        let id = frame.cmd_id();
        match self.find(id) {
            Some(job) => {
                trace!("DISPATCH: queued {:?}", id);
                self.queue.send((job, frame)).await;
                FrameOutcome::Dispatched
            }
            None => {
                warn!("DISPATCH: unsupported command {:?}, dropped", id);
                FrameOutcome::Unsupported
            }
        }
    }

    /// Wait for the next queued job
    pub async fn next_job(&self) -> (Job<C>, CommandBuffer) {
        self.queue.receive().await
    }

    /// Run one queued job if there is one
    pub fn try_run_one(&self, context: &C) -> bool {
        match self.queue.try_receive() {
            Ok((job, frame)) => {
                job(context, frame);
                true
            }
            Err(_) => false,
        }
    }

    /// Drop every queued frame
    pub fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.queue.try_receive().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
