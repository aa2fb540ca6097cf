//! Modem Transport Layer
//! 
//! The relay talks to the modem through two halves of a framed link:
//! - TX (`HalTx`): host → modem, one complete frame per `send`
//! - RX (`HalRx`): modem → host, one complete frame per `receive`
//!
//! Board support implements these over SPI, UART or shared memory. The
//! receive half is owned by the receiver loop; the transmit half is shared
//! by all callers behind the gateway lock.

/// Transmit half of the modem link
#[allow(async_fn_in_trait)]
pub trait HalTx {
    type Error: core::fmt::Debug;

    /// Transmit one complete frame
    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Receive half of the modem link
#[allow(async_fn_in_trait)]
pub trait HalRx {
    type Error: core::fmt::Debug;

    /// Wait for one complete frame and copy it into `buf`, returning its length
    ///
    /// Frames longer than `buf` are an error.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Wake a blocked `receive` so the receiver loop can stop
    fn abort_receive(&mut self);
}
