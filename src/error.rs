//! Relay Error Types
//!
//! Every layer has its own error enum; they all convert into [`Error`], which
//! is what the API wrappers return. [`Error::errno`] gives the negative
//! NuttX-style status code that C callers of the relay expect.

use crate::core::{gateway::GatewayError, memory::BufferError, protocol::ProtocolError};
use crate::relay::{callbacks::RegistryError, status::StatusError};

/// NuttX errno values used by the relay
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const EPROTO: i32 = 71;
    pub const ENETDOWN: i32 = 100;
    pub const EALREADY: i32 = 114;
    pub const EINPROGRESS: i32 = 115;
    pub const ETIMEDOUT: i32 = 116;
    pub const ECANCELED: i32 = 125;
}

/// Relay errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Argument rejected before any resource was touched
    InvalidArgument,
    /// Relay session not initialized
    NotInitialized,
    /// Modem not powered on
    NotPoweredOn,
    /// Modem already powered on
    AlreadyPoweredOn,
    /// An asynchronous call for the same command is outstanding
    InProgress,
    /// A synchronous wait for the same command is pending, or a table is full
    Busy,
    /// Command buffer pool exhausted
    NoMemory,
    /// Transport write failed
    SendFailed,
    /// No response within the timeout
    Timeout,
    /// Call canceled by a power state transition
    Canceled,
    /// Malformed or unexpected response
    Protocol(ProtocolError),
}

impl Error {
    /// Negative errno equivalent
    pub fn errno(&self) -> i32 {
        let code = match self {
            Error::InvalidArgument => errno::EINVAL,
            Error::NotInitialized => errno::ENETDOWN,
            Error::NotPoweredOn => errno::EPERM,
            Error::AlreadyPoweredOn => errno::EALREADY,
            Error::InProgress => errno::EINPROGRESS,
            Error::Busy => errno::EBUSY,
            Error::NoMemory => errno::ENOMEM,
            Error::SendFailed => errno::EIO,
            Error::Timeout => errno::ETIMEDOUT,
            Error::Canceled => errno::ECANCELED,
            Error::Protocol(_) => errno::EPROTO,
        };
        -code
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<BufferError> for Error {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::PoolExhausted => Error::NoMemory,
            BufferError::BufferTooSmall | BufferError::InvalidSize => Error::InvalidArgument,
        }
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Busy => Error::Busy,
            GatewayError::SendFailed => Error::SendFailed,
            GatewayError::Timeout => Error::Timeout,
            GatewayError::Canceled => Error::Canceled,
        }
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Busy => Error::InProgress,
            RegistryError::Full => Error::Busy,
        }
    }
}

impl From<StatusError> for Error {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::Full => Error::NoMemory,
        }
    }
}

/// Result type for relay operations
pub type Result<T> = core::result::Result<T, Error>;
