//! Modem power control

use crate::api::{fixed_payload, ApiCallback};
use crate::core::{memory::CommandBuffer, protocol::CommandId, transport::HalTx};
use crate::error::{Error, Result};
use crate::relay::{
    status::{HandlerId, ModemStatus},
    Altcom,
};

use super::LteResult;

const RES_LEN: usize = 1;

impl<T: HalTx> Altcom<T> {
    /// Power the modem on; `callback` receives the result
    ///
    /// A successful power on moves the session to `PowerOn` before the
    /// callback runs.
    pub async fn power_on(&self, callback: fn(LteResult)) -> Result<()> {
        match self.status() {
            ModemStatus::Uninitialized => return Err(Error::NotInitialized),
            ModemStatus::PowerOn => return Err(Error::AlreadyPoweredOn),
            ModemStatus::Initialized | ModemStatus::RestartOngoing => {}
        }

        self.start_async_call(CommandId::POWER_ON, ApiCallback::Result(callback), 0, |_| Ok(()))
            .await
    }

    /// Power the modem off and wait for the modem to confirm
    ///
    /// On success the session drops back to `Initialized`, which cancels every
    /// outstanding asynchronous call, a pending power on included.
    pub async fn power_off(&self) -> Result<LteResult> {
        self.ensure_initialized()?;

        let response = self
            .request(CommandId::POWER_OFF, 0, RES_LEN, self.config.lte_timeout, |_| Ok(()))
            .await?;
        let result = LteResult::from_code(response.payload()[0]);
        drop(response);

        if result.is_ok() {
            // Status may already be Initialized, so nothing would be published
            self.callbacks.unregister(CommandId::POWER_ON);
            self.bus.unsubscribe(CommandId::POWER_ON, HandlerId::RELAY);
            self.set_status(ModemStatus::Initialized);
        }
        Ok(result)
    }
}

pub(crate) fn power_on_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let result = fixed_payload(&frame, RES_LEN)
        .and_then(|mut r| r.read_u8().ok())
        .map_or(LteResult::Error, LteResult::from_code);
    drop(frame);

    // A canceled power on leaves the status alone
    match altcom.finish_async_call(CommandId::POWER_ON) {
        Some(ApiCallback::Result(callback)) => {
            if result.is_ok() {
                altcom.set_status(ModemStatus::PowerOn);
            }
            callback(result);
        }
        Some(_) => error!("LTE: power_on callback has the wrong kind"),
        None => {}
    }
}
