//! Modem error information
//!
//! The modem pushes `ERRINFO` whenever an LTE operation fails; the latest one
//! is kept on the session for `get_errinfo`.

use crate::api::fixed_payload;
use crate::core::{
    memory::CommandBuffer,
    protocol::{PayloadReader, ProtocolError},
    transport::HalTx,
};
use crate::error::Result;
use crate::relay::Altcom;

/// `err_code` is valid
pub const INDICATOR_ERRCODE: u8 = 1 << 0;
/// `err_no` is valid
pub const INDICATOR_ERRNO: u8 = 1 << 1;
/// `err_str` is valid
pub const INDICATOR_ERRSTR: u8 = 1 << 2;

/// Capacity of the error string
pub const ERRSTR_MAX_LEN: usize = 64;

const ERRINFO_LEN: usize = 1 + 4 + 4 + ERRSTR_MAX_LEN;

/// Last error reported by the modem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrInfo {
    pub indicator: u8,
    pub err_code: i32,
    pub err_no: i32,
    pub err_str: [u8; ERRSTR_MAX_LEN],
}

impl Default for ErrInfo {
    fn default() -> Self {
        Self {
            indicator: 0,
            err_code: 0,
            err_no: 0,
            err_str: [0; ERRSTR_MAX_LEN],
        }
    }
}

impl ErrInfo {
    pub fn decode(reader: &mut PayloadReader<'_>) -> core::result::Result<Self, ProtocolError> {
        let indicator = reader.read_u8()?;
        let err_code = reader.read_i32()?;
        let err_no = reader.read_i32()?;
        let mut err_str = [0; ERRSTR_MAX_LEN];
        err_str.copy_from_slice(reader.read_bytes(ERRSTR_MAX_LEN)?);

        Ok(Self {
            indicator,
            err_code,
            err_no,
            err_str,
        })
    }

    /// Error string up to its terminator, if flagged valid and UTF-8
    pub fn message(&self) -> Option<&str> {
        if self.indicator & INDICATOR_ERRSTR == 0 {
            return None;
        }
        let end = self.err_str.iter().position(|&b| b == 0).unwrap_or(ERRSTR_MAX_LEN);
        core::str::from_utf8(&self.err_str[..end]).ok()
    }
}

impl<T: HalTx> Altcom<T> {
    /// Latest error information pushed by the modem; empty if none arrived
    pub fn get_errinfo(&self) -> Result<ErrInfo> {
        self.ensure_initialized()?;
        Ok(self.errinfo.lock(|info| info.get()).unwrap_or_default())
    }
}

pub(crate) fn errinfo_job<T: HalTx>(altcom: &Altcom<T>, frame: CommandBuffer) {
    let info = fixed_payload(&frame, ERRINFO_LEN).and_then(|mut r| ErrInfo::decode(&mut r).ok());
    drop(frame);

    match info {
        Some(info) => {
            debug!("LTE: modem error code {} errno {}", info.err_code, info.err_no);
            altcom.errinfo.lock(|slot| slot.set(Some(info)));
        }
        None => error!("LTE: malformed error report dropped"),
    }
}
