//! Command Buffer Pool
//!
//! This module provides the static pool that every request, response and
//! received frame is carved from. Uses atomic-pool for zero-allocation buffer
//! management: a `CommandBuffer` returns its slot to the pool when dropped, so
//! every exit path of a call releases what it allocated.

use core::sync::atomic::{AtomicUsize, Ordering};

use atomic_pool::{pool, Box};

use crate::core::protocol::{CommandHeader, CommandId, ProtocolError, HEADER_LEN};

/// Largest command payload the modem accepts
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Buffer size: header + largest payload
pub const BUFFER_SIZE: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// Number of command buffers
pub const CMD_POOL_SIZE: usize = 32;

// Command buffer pool - 32 buffers of 1040 bytes each (doc comment not supported on macros)
pool!(CmdPool: [[u8; BUFFER_SIZE]; CMD_POOL_SIZE]);

/// Buffers currently checked out of the pool
static IN_USE: AtomicUsize = AtomicUsize::new(0);

/// Buffer pool errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// No buffers available in pool
    PoolExhausted,
    /// Payload does not fit in a buffer
    BufferTooSmall,
    /// Invalid frame length
    InvalidSize,
}

/// A pooled command frame: header followed by payload
pub struct CommandBuffer {
    data: Box<CmdPool>,
    len: usize,
}

impl CommandBuffer {
    /// Allocate a frame for `cmd_id` with a zeroed payload of `payload_len` bytes
    pub fn alloc(cmd_id: CommandId, payload_len: usize) -> Result<Self, BufferError> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(BufferError::BufferTooSmall);
        }

        let mut buffer = Self::take()?;
        let header = CommandHeader::new(cmd_id, payload_len as u16);
        header
            .encode(&mut buffer.data[..])
            .map_err(|_| BufferError::BufferTooSmall)?;
        buffer.len = HEADER_LEN + payload_len;

        Ok(buffer)
    }

    /// Allocate an empty buffer for an inbound frame
    pub fn alloc_receive() -> Result<Self, BufferError> {
        Self::take()
    }

    fn take() -> Result<Self, BufferError> {
        let data = Box::<CmdPool>::new([0; BUFFER_SIZE]).ok_or(BufferError::PoolExhausted)?;
        IN_USE.fetch_add(1, Ordering::Relaxed);
        Ok(Self { data, len: 0 })
    }

    /// Whole buffer for the transport to receive into
    pub fn receive_space(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Set the number of valid bytes after receiving
    pub fn set_len(&mut self, len: usize) -> Result<(), BufferError> {
        if len > BUFFER_SIZE {
            return Err(BufferError::InvalidSize);
        }
        self.len = len;
        Ok(())
    }

    /// Command ID as written in the header, without validation
    pub fn cmd_id(&self) -> CommandId {
        CommandId(u16::from_be_bytes([self.data[6], self.data[7]]))
    }

    /// Validate and decode the header
    pub fn header(&self) -> Result<CommandHeader, ProtocolError> {
        CommandHeader::decode(self.as_slice())
    }

    /// Stamp sequence and transaction IDs and recompute the header checksum
    pub fn seal(&mut self, seq_id: u8, trans_id: u16) {
        let payload_len = self.payload().len() as u16;
        let header = CommandHeader {
            seq_id,
            cmd_id: self.cmd_id(),
            trans_id,
            data_len: payload_len,
        };
        // The buffer always has room for a header
        let _ = header.encode(&mut self.data[..]);
    }

    /// Frame bytes (header + payload)
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        self.data.get(HEADER_LEN..self.len).unwrap_or(&[])
    }

    /// Mutable payload bytes
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        self.data.get_mut(HEADER_LEN..len).unwrap_or(&mut [])
    }

    /// Get the frame length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer holds no frame
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        IN_USE.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Allocate the request buffer and the response buffer of a synchronous call
///
/// Either both buffers are returned or none stays allocated.
pub fn alloc_cmd_and_res(
    cmd_id: CommandId,
    req_len: usize,
    res_len: usize,
) -> Result<(CommandBuffer, CommandBuffer), BufferError> {
    let request = CommandBuffer::alloc(cmd_id, req_len)?;
    let response = CommandBuffer::alloc(cmd_id.to_response(), res_len)?;
    Ok((request, response))
}

/// Buffer pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoolStats {
    pub allocated: usize,
    pub available: usize,
}

/// Get current pool statistics
pub fn stats() -> PoolStats {
    let allocated = IN_USE.load(Ordering::Relaxed);
    PoolStats {
        allocated,
        available: CMD_POOL_SIZE.saturating_sub(allocated),
    }
}
