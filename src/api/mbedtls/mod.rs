//! mbedTLS Proxy Commands
//!
//! The TLS stack runs on the modem; these wrappers forward mbedTLS calls and
//! wait for the result. Contexts on this side are only IDs naming the
//! modem-side objects. Every call needs an initialized session and waits
//! `AltcomConfig::sync_timeout` for its response.

pub mod cipher;
pub mod config;
pub mod ctx_id;
pub mod pk;
pub mod ssl;

pub use cipher::{CipherContext, CipherUpdate};
pub use ctx_id::{ContextIdAllocator, ContextKind};
pub use pk::PkContext;
pub use ssl::{SslConfig, SslContext};

/// Length of the `ret_code` field that opens every mbedTLS response
pub(crate) const RET_CODE_LEN: usize = 4;
