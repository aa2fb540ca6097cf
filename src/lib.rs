#![no_std]

//! ALTCOM Modem API Relay Library
//!
//! Host-side relay that proxies LTE and mbedTLS API calls to the modem
//! co-processor over a framed serial transport, organized into layers:
//!
//! - `core`: wire protocol, command buffer pool, transport traits and the
//!   synchronous command gateway
//! - `relay`: the session object with its callback registry, status bus and
//!   event/job dispatcher
//! - `api`: per-command wrappers built on the relay (LTE and mbedTLS)

// This mod MUST go first, so that the others see its macros.
#[macro_use]
pub(crate) mod fmt;

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod relay;

pub use config::AltcomConfig;
pub use error::Error;
pub use relay::Altcom;
