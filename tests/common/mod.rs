//! Common test utilities for the host integration tests
//!
//! This module provides shared functionality for all relay tests:
//! - A mock modem link implementing the transport traits
//! - Frame builders for modem responses and notifications
//! - A session runner that drives caller, receiver and worker together
//! - Test serialization (the command buffer pool is a process-wide static)

#![allow(dead_code)]

use core::future::Future;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use altcom::core::{
    memory::BUFFER_SIZE,
    protocol::{encode_frame, CommandHeader, CommandId, HEADER_LEN},
    transport::{HalRx, HalTx},
};
use altcom::relay::status::ModemStatus;
use altcom::{Altcom, AltcomConfig};
use embassy_futures::join::join3;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{with_timeout, Duration, Timer};
use heapless::Vec;

pub type Frame = Vec<u8, BUFFER_SIZE>;

/// Frames buffered in each direction of the mock link
pub const LINK_DEPTH: usize = 16;

/// How long tests wait for something that should happen
pub const TEST_WAIT: Duration = Duration::from_secs(2);

static SERIAL: Mutex<()> = Mutex::new(());

/// Run tests that touch the buffer pool one at a time
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkError;

/// Both directions of a simulated modem link
pub struct ModemLink {
    /// Host → modem frames
    sent: Channel<CriticalSectionRawMutex, Frame, LINK_DEPTH>,
    /// Modem → host frames
    inbound: Channel<CriticalSectionRawMutex, Frame, LINK_DEPTH>,
    fail_sends: AtomicBool,
    send_count: AtomicUsize,
    abort_count: AtomicUsize,
}

impl ModemLink {
    pub const fn new() -> Self {
        Self {
            sent: Channel::new(),
            inbound: Channel::new(),
            fail_sends: AtomicBool::new(false),
            send_count: AtomicUsize::new(0),
            abort_count: AtomicUsize::new(0),
        }
    }

    pub fn tx(&self) -> MockTx<'_> {
        MockTx { link: self }
    }

    pub fn rx(&self) -> MockRx<'_> {
        MockRx { link: self }
    }

    /// Make every following transport write fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Transport writes attempted so far
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> usize {
        self.abort_count.load(Ordering::SeqCst)
    }

    /// Wait for the next frame the host wrote
    pub async fn next_sent(&self) -> Frame {
        self.sent.receive().await
    }

    pub fn try_next_sent(&self) -> Option<Frame> {
        self.sent.try_receive().ok()
    }

    /// Queue raw bytes for the host to receive
    pub fn inject_raw(&self, bytes: &[u8]) {
        let frame = Frame::from_slice(bytes).expect("frame too large");
        self.inbound.try_send(frame).expect("inbound link full");
    }

    /// Queue a well-formed frame for the host to receive
    pub fn inject(&self, cmd: CommandId, payload: &[u8]) {
        self.inject_raw(&build_frame(cmd, payload));
    }

    /// Queue the response to `request` with `payload`
    pub fn respond(&self, request: CommandId, payload: &[u8]) {
        self.inject(request.to_response(), payload);
    }
}

pub struct MockTx<'a> {
    link: &'a ModemLink,
}

impl HalTx for MockTx<'_> {
    type Error = LinkError;

    async fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.link.send_count.fetch_add(1, Ordering::SeqCst);
        if self.link.fail_sends.load(Ordering::SeqCst) {
            return Err(LinkError);
        }
        let frame = Frame::from_slice(frame).map_err(|_| LinkError)?;
        self.link.sent.try_send(frame).map_err(|_| LinkError)
    }
}

pub struct MockRx<'a> {
    link: &'a ModemLink,
}

impl HalRx for MockRx<'_> {
    type Error = LinkError;

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let frame = self.link.inbound.receive().await;
        let dst = buf.get_mut(..frame.len()).ok_or(LinkError)?;
        dst.copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn abort_receive(&mut self) {
        self.link.abort_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Encode a frame the way the modem would
pub fn build_frame(cmd: CommandId, payload: &[u8]) -> Frame {
    let header = CommandHeader::new(cmd, payload.len() as u16);
    let mut out = [0u8; BUFFER_SIZE];
    let len = encode_frame(&header, payload, &mut out).expect("encode frame");
    Frame::from_slice(&out[..len]).expect("frame fits")
}

/// Command ID of a frame the host wrote
pub fn sent_cmd(frame: &[u8]) -> CommandId {
    CommandHeader::decode(frame).expect("host wrote a valid header").cmd_id
}

/// Payload of a frame the host wrote
pub fn sent_payload(frame: &[u8]) -> &[u8] {
    &frame[HEADER_LEN..]
}

/// Config with short timeouts for tests
pub fn test_config() -> AltcomConfig {
    AltcomConfig::default()
        .with_lte_timeout(altcom::core::gateway::Timeout::from_millis(500))
        .with_rx_retry_delay(Duration::from_millis(1))
}

/// Session over `link`, initialized
pub fn session(link: &ModemLink) -> Altcom<MockTx<'_>> {
    let altcom = Altcom::new(link.tx(), test_config());
    altcom.initialize();
    altcom
}

/// Session over `link`, initialized and powered on
pub fn powered_session(link: &ModemLink) -> Altcom<MockTx<'_>> {
    let altcom = session(link);
    altcom.set_status(ModemStatus::PowerOn);
    altcom
}

/// Run `body` while the receiver and worker loops serve `altcom`, then shut
/// the session down
pub fn run_session<'l, R>(altcom: &Altcom<MockTx<'l>>, link: &'l ModemLink, body: impl Future<Output = R>) -> R {
    let mut rx = link.rx();
    let (result, _, _) = embassy_futures::block_on(join3(
        async {
            let result = body.await;
            altcom.shutdown();
            result
        },
        altcom.run_receiver(&mut rx),
        altcom.run_worker(),
    ));
    result
}

/// Poll `condition` until it holds or the test wait runs out
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    with_timeout(TEST_WAIT, async {
        while !condition() {
            Timer::after(Duration::from_millis(1)).await;
        }
    })
    .await
    .is_ok()
}

/// Give the receiver and worker a chance to run
pub async fn settle() {
    Timer::after(Duration::from_millis(20)).await;
}
