//! API Wrappers
//!
//! Per-command wrappers marshal typed arguments into a command buffer and
//! either wait for the response through the gateway (synchronous calls) or
//! register a callback that a dispatcher job resolves later (asynchronous
//! calls). This module holds the plumbing they share.

pub mod lte;
pub mod mbedtls;

use crate::core::{
    gateway::Timeout,
    memory::{self, CommandBuffer},
    protocol::{CommandId, PayloadReader, PayloadWriter, ProtocolError},
    transport::HalTx,
};
use crate::error::{Error, Result};
use crate::relay::{
    dispatcher::Job,
    status::{Disposition, HandlerId, ModemStatus},
    Altcom,
};

use lte::{LteResult, NetInfo};

/// Callback of an outstanding asynchronous call
///
/// Completions always run on the worker context.
#[derive(Clone, Copy)]
pub enum ApiCallback {
    /// Plain result (power on, set CE)
    Result(fn(LteResult)),
    /// IMS capability: result, IMS enabled
    ImsCap(fn(LteResult, bool)),
    /// PDN deactivation: result, error cause
    DeactivatePdn(fn(LteResult, u8)),
    /// Network information report
    NetInfo(fn(&NetInfo)),
}

/// Jobs for every frame the modem sends without a synchronous waiter
pub(crate) fn handlers<T: HalTx>() -> [(CommandId, Job<Altcom<T>>); 6] {
    [
        (CommandId::POWER_ON.to_response(), lte::power::power_on_job::<T>),
        (CommandId::SET_CE.to_response(), lte::setce::set_ce_job::<T>),
        (CommandId::GET_IMS_CAP.to_response(), lte::getimscap::get_imscap_job::<T>),
        (CommandId::DEACTIVATE_PDN.to_response(), lte::deactivatepdn::deactivate_pdn_job::<T>),
        (CommandId::REPORT_NETINFO, lte::repnetinfo::report_netinfo_job::<T>),
        (CommandId::ERRINFO, lte::errinfo::errinfo_job::<T>),
    ]
}

/// Status handler of every asynchronous call: drop the pending callback once
/// the modem leaves `PowerOn`
pub(crate) fn cancel_on_power_down<T: HalTx>(
    altcom: &Altcom<T>,
    command: CommandId,
    new: ModemStatus,
    old: ModemStatus,
) -> Disposition {
    if new < ModemStatus::PowerOn {
        info!("API: {:?} canceled ({:?} -> {:?})", command, old, new);
        altcom.callbacks.unregister(command);
        return Disposition::Clear;
    }
    Disposition::Keep
}

/// Unwinds a half-started asynchronous call unless disarmed
struct PendingCall<'a, T: HalTx> {
    altcom: &'a Altcom<T>,
    command: CommandId,
    armed: bool,
}

impl<T: HalTx> PendingCall<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T: HalTx> Drop for PendingCall<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.altcom.callbacks.unregister(self.command);
            self.altcom.bus.unsubscribe(self.command, HandlerId::RELAY);
        }
    }
}

impl<T: HalTx> Altcom<T> {
    /// Register `callback` for `command` and post the request built by `fill`
    ///
    /// The call is accepted once the request is on the wire; its result
    /// arrives through the callback. Any failure before that leaves neither a
    /// registry entry nor a status subscription behind.
    pub(crate) async fn start_async_call<F>(
        &self,
        command: CommandId,
        callback: ApiCallback,
        payload_len: usize,
        fill: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut PayloadWriter<'_>) -> core::result::Result<(), ProtocolError>,
    {
        self.callbacks.register(command, callback).map_err(|e| {
            warn!("API: {:?} busy", command);
            Error::from(e)
        })?;
        let pending = PendingCall {
            altcom: self,
            command,
            armed: true,
        };

        self.bus
            .subscribe(command, HandlerId::RELAY, cancel_on_power_down::<T>)?;

        let mut request = CommandBuffer::alloc(command, payload_len).map_err(|e| {
            error!("API: no command buffer for {:?}", command);
            Error::from(e)
        })?;
        fill(&mut PayloadWriter::new(request.payload_mut()))?;

        self.gateway.post(request).await?;
        pending.disarm();
        Ok(())
    }

    /// Take the callback of a completed asynchronous call and drop its status
    /// subscription
    pub(crate) fn finish_async_call(&self, command: CommandId) -> Option<ApiCallback> {
        let callback = self.callbacks.consume(command);
        self.bus.unsubscribe(command, HandlerId::RELAY);
        if callback.is_none() {
            error!("API: unexpected response for {:?}, no callback registered", command);
        }
        callback
    }

    /// Synchronous request with a fixed-size response
    ///
    /// Returns the response buffer; its payload has exactly `res_len` bytes.
    pub(crate) async fn request<F>(
        &self,
        command: CommandId,
        req_len: usize,
        res_len: usize,
        timeout: Timeout,
        fill: F,
    ) -> Result<CommandBuffer>
    where
        F: FnOnce(&mut PayloadWriter<'_>) -> core::result::Result<(), ProtocolError>,
    {
        let (mut request, mut response) =
            memory::alloc_cmd_and_res(command, req_len, res_len).map_err(|e| {
                error!("API: no command buffers for {:?}", command);
                Error::from(e)
            })?;
        fill(&mut PayloadWriter::new(request.payload_mut()))?;

        let received = self
            .gateway
            .send(&mut request, response.payload_mut(), timeout)
            .await
            .map_err(|e| {
                error!("API: {:?} failed: {:?}", command, e);
                Error::from(e)
            })?;

        if received != res_len {
            error!("API: unexpected response length {} for {:?}", received, command);
            return Err(Error::Protocol(ProtocolError::InvalidLength));
        }
        Ok(response)
    }
}

/// Reader over a job frame whose payload must be exactly `len` bytes
pub(crate) fn fixed_payload(frame: &CommandBuffer, len: usize) -> Option<PayloadReader<'_>> {
    let payload = frame.payload();
    if payload.len() != len {
        error!("API: {:?} payload is {} bytes, expected {}", frame.cmd_id(), payload.len(), len);
        return None;
    }
    Some(PayloadReader::new(payload))
}
