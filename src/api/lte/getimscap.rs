//! IMS capability query

use crate::api::{fixed_payload, ApiCallback};
use crate::core::{memory::CommandBuffer, protocol::CommandId, transport::HalTx};
use crate::error::Result;
use crate::relay::Altcom;

use super::{LteResult, RES_OK};

const RES_LEN: usize = 2;

/// Wire value of an IMS capable modem
pub const IMSCAP_ENABLE: u8 = 0;

impl<T: HalTx> Altcom<T> {
    /// Ask whether the modem supports IMS; `callback` receives the answer
    pub async fn get_imscap(&self, callback: fn(LteResult, bool)) -> Result<()> {
        self.check_poweron_status()?;

        self.start_async_call(CommandId::GET_IMS_CAP, ApiCallback::ImsCap(callback), 0, |_| Ok(()))
            .await
    }
}

pub(crate) fn get_imscap_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let (result, enabled) = fixed_payload(&frame, RES_LEN)
        .and_then(|mut r| Some((r.read_u8().ok()?, r.read_u8().ok()?)))
        .map_or((LteResult::Error, false), |(result, cap)| {
            if result == RES_OK {
                (LteResult::Ok, cap == IMSCAP_ENABLE)
            } else {
                (LteResult::Error, false)
            }
        });
    drop(frame);

    match altcom.finish_async_call(CommandId::GET_IMS_CAP) {
        Some(ApiCallback::ImsCap(callback)) => callback(result, enabled),
        Some(_) => error!("LTE: get_imscap callback has the wrong kind"),
        None => {}
    }
}
