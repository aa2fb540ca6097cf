//! Public key context commands

use crate::core::{
    protocol::{CommandId, PayloadReader},
    transport::HalTx,
};
use crate::error::Result;
use crate::relay::Altcom;

use super::{ContextKind, RET_CODE_LEN};

/// Capacity of the PEM output field
pub const PEM_BUF_LEN: usize = 512;

/// Modem-side public key context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PkContext {
    pub id: u32,
}

impl<T: HalTx> Altcom<T> {
    /// Create a public key context on the modem
    pub async fn pk_init(&self) -> Result<PkContext> {
        self.ensure_initialized()?;

        let ctx = PkContext {
            id: self.ctx_ids.allocate(ContextKind::Pk),
        };
        let response = self
            .request(CommandId::TLS_PK_INIT, 4, RET_CODE_LEN, self.config.sync_timeout, |w| {
                w.put_u32(ctx.id)?;
                Ok(())
            })
            .await?;
        let ret = PayloadReader::new(response.payload()).read_i32()?;
        debug!("TLS: pk_init ctx {} ret {}", ctx.id, ret);
        Ok(ctx)
    }

    /// Export the private key of `ctx` as PEM into `buf`
    ///
    /// At most `PEM_BUF_LEN` bytes are requested. `buf` is only written when
    /// the modem reports success; the mbedTLS result code is returned.
    pub async fn pk_write_key_pem(&self, ctx: &PkContext, buf: &mut [u8]) -> Result<i32> {
        self.ensure_initialized()?;

        let size = buf.len().min(PEM_BUF_LEN);
        let response = self
            .request(
                CommandId::TLS_PK_WRITE_KEY_PEM,
                8,
                RET_CODE_LEN + PEM_BUF_LEN,
                self.config.sync_timeout,
                |w| {
                    w.put_u32(ctx.id)?.put_u32(size as u32)?;
                    Ok(())
                },
            )
            .await?;

        let mut reader = PayloadReader::new(response.payload());
        let ret = reader.read_i32()?;
        let pem = reader.read_bytes(PEM_BUF_LEN)?;
        if ret == 0 {
            buf[..size].copy_from_slice(&pem[..size]);
        }
        Ok(ret)
    }
}
