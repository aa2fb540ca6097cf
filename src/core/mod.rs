//! Core Relay Infrastructure
//! 
//! Provides the services every API call is built on.
//! This includes the wire protocol, the command buffer pool, the transport
//! abstraction and the synchronous command gateway.

pub mod gateway;
pub mod memory;
pub mod protocol;
pub mod transport;
