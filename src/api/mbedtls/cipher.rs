//! Cipher context commands

use crate::core::{
    protocol::{CommandId, PayloadReader, ProtocolError},
    transport::HalTx,
};
use crate::error::{Error, Result};
use crate::relay::Altcom;

use super::{ContextKind, RET_CODE_LEN};

/// Largest input of one update
pub const CIPHER_INPUT_LEN: usize = 64;

/// Capacity of the output field
pub const CIPHER_OUTPUT_LEN: usize = 80;

/// Modem-side cipher context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CipherContext {
    pub id: u32,
}

/// Result of a cipher update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CipherUpdate {
    /// mbedTLS result code
    pub ret_code: i32,
    /// Bytes written to the output buffer
    pub olen: usize,
}

impl<T: HalTx> Altcom<T> {
    /// Name a fresh cipher context
    pub fn cipher_init(&self) -> CipherContext {
        CipherContext {
            id: self.ctx_ids.allocate(ContextKind::Cipher),
        }
    }

    /// Feed `input` through the cipher of `ctx`, writing the produced bytes
    /// to `output`
    pub async fn cipher_update(&self, ctx: &CipherContext, input: &[u8], output: &mut [u8]) -> Result<CipherUpdate> {
        if input.len() > CIPHER_INPUT_LEN {
            error!("TLS: cipher input of {} bytes exceeds {}", input.len(), CIPHER_INPUT_LEN);
            return Err(Error::InvalidArgument);
        }
        self.ensure_initialized()?;

        let response = self
            .request(
                CommandId::TLS_CIPHER_UPDATE,
                4 + CIPHER_INPUT_LEN + 4,
                RET_CODE_LEN + CIPHER_OUTPUT_LEN + 4,
                self.config.sync_timeout,
                |w| {
                    w.put_u32(ctx.id)?
                        .put_padded(input, CIPHER_INPUT_LEN)?
                        .put_u32(input.len() as u32)?;
                    Ok(())
                },
            )
            .await?;

        let mut reader = PayloadReader::new(response.payload());
        let ret_code = reader.read_i32()?;
        let produced = reader.read_bytes(CIPHER_OUTPUT_LEN)?;
        let olen = reader.read_u32()? as usize;
        if olen > CIPHER_OUTPUT_LEN {
            error!("TLS: cipher output length {} out of range", olen);
            return Err(Error::Protocol(ProtocolError::InvalidLength));
        }

        let olen = if olen > output.len() {
            warn!("TLS: cipher output truncated to {} bytes", output.len());
            output.len()
        } else {
            olen
        };
        output[..olen].copy_from_slice(&produced[..olen]);

        Ok(CipherUpdate { ret_code, olen })
    }
}
