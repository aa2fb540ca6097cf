//! Relay Configuration
//!
//! Runtime knobs of a relay session plus the compile-time capacities of its
//! tables. Capacities are re-exported here so firmware can size its own
//! resources against them.

use embassy_time::Duration;

use crate::core::gateway::Timeout;

pub use crate::core::gateway::MAX_SYNC_WAITERS;
pub use crate::core::memory::{CMD_POOL_SIZE, MAX_PAYLOAD_LEN};
pub use crate::relay::callbacks::MAX_PENDING_CALLBACKS;
pub use crate::relay::dispatcher::{JOB_QUEUE_DEPTH, MAX_HANDLERS};
pub use crate::relay::status::MAX_STATUS_SUBSCRIBERS;

/// Default wait for LTE synchronous commands
pub const DEFAULT_LTE_TIMEOUT_MS: u64 = 5000;

/// Default pause of the receiver after a transport error
pub const DEFAULT_RX_RETRY_DELAY_MS: u64 = 10;

/// Relay session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltcomConfig {
    /// Wait of the mbedTLS proxy calls
    pub sync_timeout: Timeout,
    /// Wait of the LTE synchronous commands
    pub lte_timeout: Timeout,
    /// Receiver back-off after a transport error or pool exhaustion
    pub rx_retry_delay: Duration,
}

impl Default for AltcomConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Timeout::Forever,
            lte_timeout: Timeout::from_millis(DEFAULT_LTE_TIMEOUT_MS),
            rx_retry_delay: Duration::from_millis(DEFAULT_RX_RETRY_DELAY_MS),
        }
    }
}

impl AltcomConfig {
    pub fn with_sync_timeout(mut self, timeout: Timeout) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub fn with_lte_timeout(mut self, timeout: Timeout) -> Self {
        self.lte_timeout = timeout;
        self
    }

    pub fn with_rx_retry_delay(mut self, delay: Duration) -> Self {
        self.rx_retry_delay = delay;
        self
    }
}
