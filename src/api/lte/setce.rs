//! Coverage Enhancement (CE) mode selection

use crate::api::{fixed_payload, ApiCallback};
use crate::core::{memory::CommandBuffer, protocol::CommandId, transport::HalTx};
use crate::error::Result;
use crate::relay::Altcom;

use super::LteResult;

const REQ_LEN: usize = 2;
const RES_LEN: usize = 1;

/// Wire value of an enabled CE mode
pub const CE_ENABLE: u8 = 1;
/// Wire value of a disabled CE mode
pub const CE_DISABLE: u8 = 0;

/// Coverage enhancement modes to enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CeSettings {
    pub mode_a_enable: bool,
    pub mode_b_enable: bool,
}

fn ce_flag(enable: bool) -> u8 {
    if enable {
        CE_ENABLE
    } else {
        CE_DISABLE
    }
}

impl<T: HalTx> Altcom<T> {
    /// Select the CE modes; `callback` receives the modem's verdict
    pub async fn set_ce(&self, settings: &CeSettings, callback: fn(LteResult)) -> Result<()> {
        self.check_poweron_status()?;

        self.start_async_call(CommandId::SET_CE, ApiCallback::Result(callback), REQ_LEN, |w| {
            w.put_u8(ce_flag(settings.mode_a_enable))?
                .put_u8(ce_flag(settings.mode_b_enable))?;
            Ok(())
        })
        .await
    }
}

pub(crate) fn set_ce_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let result = fixed_payload(&frame, RES_LEN)
        .and_then(|mut r| r.read_u8().ok())
        .map_or(LteResult::Error, LteResult::from_code);
    drop(frame);

    match altcom.finish_async_call(CommandId::SET_CE) {
        Some(ApiCallback::Result(callback)) => callback(result),
        Some(_) => error!("LTE: set_ce callback has the wrong kind"),
        None => {}
    }
}
