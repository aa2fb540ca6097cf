//! Network information reporting
//!
//! Enabling the report installs a persistent callback that every
//! `REPORT_NETINFO` notification invokes; it stays registered until the
//! report is disabled or the session shuts down.

use heapless::Vec;

use crate::api::{fixed_payload, ApiCallback};
use crate::core::{
    memory::CommandBuffer,
    protocol::{CommandId, PayloadReader, ProtocolError},
    transport::HalTx,
};
use crate::error::{Error, Result};
use crate::relay::Altcom;

use super::LteResult;

const REQ_LEN: usize = 1;
const RES_LEN: usize = 1;

/// Wire value that turns the report on
pub const REPORT_ENABLE: u8 = 0;
/// Wire value that turns the report off
pub const REPORT_DISABLE: u8 = 1;

/// Most PDNs one report describes
pub const MAX_PDN_COUNT: usize = 5;

/// Encoded size of one PDN entry
pub const PDN_ENTRY_LEN: usize = 7;

/// Encoded size of a report
pub const NETINFO_LEN: usize = 2 + MAX_PDN_COUNT * PDN_ENTRY_LEN;

/// Network attach state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkState {
    Attached,
    Detached,
}

/// One active PDN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdnInfo {
    pub session_id: u8,
    pub active: bool,
    pub apn_type: u32,
    pub ip_count: u8,
}

/// Network information report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInfo {
    pub state: NetworkState,
    pub pdns: Vec<PdnInfo, MAX_PDN_COUNT>,
}

impl NetInfo {
    /// Decode a report; unused PDN slots are skipped
    pub fn decode(reader: &mut PayloadReader<'_>) -> core::result::Result<Self, ProtocolError> {
        let state = match reader.read_u8()? {
            0 => NetworkState::Attached,
            _ => NetworkState::Detached,
        };
        let count = reader.read_u8()? as usize;
        if count > MAX_PDN_COUNT {
            return Err(ProtocolError::InvalidLength);
        }

        let mut pdns = Vec::new();
        for index in 0..MAX_PDN_COUNT {
            let pdn = PdnInfo {
                session_id: reader.read_u8()?,
                active: reader.read_u8()? != 0,
                apn_type: reader.read_u32()?,
                ip_count: reader.read_u8()?,
            };
            if index < count {
                pdns.push(pdn).map_err(|_| ProtocolError::BufferFull)?;
            }
        }

        Ok(Self { state, pdns })
    }
}

impl<T: HalTx> Altcom<T> {
    /// Turn the network information report on (`Some`) or off (`None`)
    ///
    /// The report callback is only installed or removed once the modem
    /// accepted the change.
    pub async fn set_report_netinfo(&self, callback: Option<fn(&NetInfo)>) -> Result<LteResult> {
        self.check_poweron_status()?;
        if callback.is_some()
            && !self.callbacks.is_registered(CommandId::REPORT_NETINFO)
            && self.callbacks.is_full()
        {
            error!("LTE: no room for the network report callback");
            return Err(Error::Busy);
        }

        let report = if callback.is_some() {
            REPORT_ENABLE
        } else {
            REPORT_DISABLE
        };
        let response = self
            .request(CommandId::SET_REP_NETINFO, REQ_LEN, RES_LEN, self.config.lte_timeout, |w| {
                w.put_u8(report)?;
                Ok(())
            })
            .await?;
        let result = LteResult::from_code(response.payload()[0]);
        drop(response);

        if result.is_ok() {
            match callback {
                Some(callback) => {
                    self.callbacks
                        .replace(CommandId::REPORT_NETINFO, ApiCallback::NetInfo(callback))?;
                }
                None => self.callbacks.unregister(CommandId::REPORT_NETINFO),
            }
        }
        Ok(result)
    }
}

pub(crate) fn report_netinfo_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let info = fixed_payload(&frame, NETINFO_LEN).and_then(|mut r| NetInfo::decode(&mut r).ok());
    drop(frame);

    let Some(info) = info else {
        error!("LTE: malformed network report dropped");
        return;
    };

    match altcom.callbacks.get(CommandId::REPORT_NETINFO) {
        Some(ApiCallback::NetInfo(callback)) => callback(&info),
        Some(_) => error!("LTE: network report callback has the wrong kind"),
        None => debug!("LTE: network report without subscriber"),
    }
}
