//! PDN deactivation

use crate::api::{fixed_payload, ApiCallback};
use crate::core::{memory::CommandBuffer, protocol::CommandId, transport::HalTx};
use crate::error::Result;
use crate::relay::Altcom;

use super::LteResult;

const REQ_LEN: usize = 1;
const RES_LEN: usize = 2;

impl<T: HalTx> Altcom<T> {
    /// Tear down the PDN `session_id`; `callback` receives the result and
    /// the modem's error cause
    pub async fn deactivate_pdn(&self, session_id: u8, callback: fn(LteResult, u8)) -> Result<()> {
        self.check_poweron_status()?;

        self.start_async_call(
            CommandId::DEACTIVATE_PDN,
            ApiCallback::DeactivatePdn(callback),
            REQ_LEN,
            |w| {
                w.put_u8(session_id)?;
                Ok(())
            },
        )
        .await
    }
}

pub(crate) fn deactivate_pdn_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let (result, errcause) = fixed_payload(&frame, RES_LEN)
        .and_then(|mut r| Some((r.read_u8().ok()?, r.read_u8().ok()?)))
        .map_or((LteResult::Error, 0), |(result, errcause)| {
            (LteResult::from_code(result), errcause)
        });
    drop(frame);

    match altcom.finish_async_call(CommandId::DEACTIVATE_PDN) {
        Some(ApiCallback::DeactivatePdn(callback)) => callback(result, errcause),
        Some(_) => error!("LTE: deactivate_pdn callback has the wrong kind"),
        None => {}
    }
}
