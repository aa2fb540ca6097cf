//! SSL configuration commands

use crate::core::{
    protocol::{CommandId, PayloadReader},
    transport::HalTx,
};
use crate::error::{Error, Result};
use crate::relay::Altcom;

use super::{SslConfig, RET_CODE_LEN};

/// Most ciphersuites one configuration carries
pub const MAX_CIPHERSUITES: usize = 32;

/// Peer verification modes
pub mod authmode {
    pub const VERIFY_NONE: i32 = 0;
    pub const VERIFY_OPTIONAL: i32 = 1;
    pub const VERIFY_REQUIRED: i32 = 2;
}

impl<T: HalTx> Altcom<T> {
    /// Set the peer verification mode of `conf`
    pub async fn ssl_conf_authmode(&self, conf: &SslConfig, mode: i32) -> Result<i32> {
        self.ensure_initialized()?;
        debug!("TLS: conf_authmode conf {} mode {}", conf.id, mode);

        let response = self
            .request(CommandId::TLS_CONFIG_AUTHMODE, 8, RET_CODE_LEN, self.config.sync_timeout, |w| {
                w.put_u32(conf.id)?.put_i32(mode)?;
                Ok(())
            })
            .await?;
        let ret = PayloadReader::new(response.payload()).read_i32()?;
        Ok(ret)
    }

    /// Restrict `conf` to `suites`, in preference order
    ///
    /// The list ends at its first zero entry. The wire field is zero filled.
    pub async fn ssl_conf_ciphersuites(&self, conf: &SslConfig, suites: &[i32]) -> Result<i32> {
        let count = suites.iter().position(|&s| s == 0).unwrap_or(suites.len());
        if count > MAX_CIPHERSUITES {
            error!("TLS: {} ciphersuites, at most {} allowed", count, MAX_CIPHERSUITES);
            return Err(Error::InvalidArgument);
        }
        self.ensure_initialized()?;

        let response = self
            .request(
                CommandId::TLS_CONFIG_CIPHERSUITES,
                4 + 4 * MAX_CIPHERSUITES,
                RET_CODE_LEN,
                self.config.sync_timeout,
                |w| {
                    w.put_u32(conf.id)?;
                    for index in 0..MAX_CIPHERSUITES {
                        let suite = if index < count { suites[index] } else { 0 };
                        w.put_i32(suite)?;
                    }
                    Ok(())
                },
            )
            .await?;
        let ret = PayloadReader::new(response.payload()).read_i32()?;
        Ok(ret)
    }
}
