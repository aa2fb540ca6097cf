//! LTE Control Commands
//!
//! Power control, coverage enhancement, IMS capability, PDN deactivation and
//! the modem-initiated network information and error reports.

pub mod deactivatepdn;
pub mod errinfo;
pub mod getimscap;
pub mod power;
pub mod repnetinfo;
pub mod setce;

pub use errinfo::ErrInfo;
pub use repnetinfo::{NetInfo, PdnInfo};
pub use setce::CeSettings;

/// Response result byte: success
pub const RES_OK: u8 = 0;
/// Response result byte: failure
pub const RES_ERR: u8 = 1;
/// Response result byte: canceled by the modem
pub const RES_CANCEL: u8 = 2;

/// Outcome reported to LTE callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LteResult {
    Ok,
    Error,
    Canceled,
}

impl LteResult {
    /// Map a response result byte; unknown codes are errors
    pub fn from_code(code: u8) -> Self {
        match code {
            RES_OK => LteResult::Ok,
            RES_CANCEL => LteResult::Canceled,
            _ => LteResult::Error,
        }
    }

    pub fn is_ok(self) -> bool {
        self == LteResult::Ok
    }
}

impl From<u8> for LteResult {
    fn from(code: u8) -> Self {
        Self::from_code(code)
    }
}
