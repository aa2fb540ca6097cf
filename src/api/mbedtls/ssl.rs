//! SSL context commands

use crate::core::{
    protocol::{CommandId, PayloadReader},
    transport::HalTx,
};
use crate::error::Result;
use crate::relay::Altcom;

use super::{ContextKind, RET_CODE_LEN};

/// Length of the version string field
pub const VERSION_LEN: usize = 16;

pub const SSL_V3_0: &str = "SSLv3.0";
pub const TLS_V1_0: &str = "TLSv1.0";
pub const TLS_V1_1: &str = "TLSv1.1";
pub const TLS_V1_2: &str = "TLSv1.2";
pub const DTLS_V1_0: &str = "DTLSv1.0";
pub const DTLS_V1_2: &str = "DTLSv1.2";
pub const TLS_UNKNOWN: &str = "unknown";
pub const DTLS_UNKNOWN: &str = "unknown (DTLS)";

const KNOWN_VERSIONS: [&str; 8] = [
    SSL_V3_0,
    TLS_V1_0,
    TLS_V1_1,
    TLS_V1_2,
    DTLS_V1_0,
    DTLS_V1_2,
    TLS_UNKNOWN,
    DTLS_UNKNOWN,
];

/// Modem-side SSL context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SslContext {
    pub id: u32,
}

/// Modem-side SSL configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SslConfig {
    pub id: u32,
}

impl<T: HalTx> Altcom<T> {
    /// Name a fresh SSL context
    pub fn ssl_init(&self) -> SslContext {
        SslContext {
            id: self.ctx_ids.allocate(ContextKind::Ssl),
        }
    }

    /// Name a fresh SSL configuration
    pub fn ssl_config_init(&self) -> SslConfig {
        SslConfig {
            id: self.ctx_ids.allocate(ContextKind::SslConfig),
        }
    }

    /// Bind `conf` to `ssl`; returns the mbedTLS result code
    pub async fn ssl_setup(&self, ssl: &SslContext, conf: &SslConfig) -> Result<i32> {
        self.ensure_initialized()?;
        debug!("TLS: ssl_setup ssl {} conf {}", ssl.id, conf.id);

        let response = self
            .request(CommandId::TLS_SSL_SETUP, 8, RET_CODE_LEN, self.config.sync_timeout, |w| {
                w.put_u32(ssl.id)?.put_u32(conf.id)?;
                Ok(())
            })
            .await?;
        let ret = PayloadReader::new(response.payload()).read_i32()?;
        Ok(ret)
    }

    /// Negotiated protocol version of `ssl`
    pub async fn ssl_get_version(&self, ssl: &SslContext) -> Result<&'static str> {
        self.ensure_initialized()?;

        let response = self
            .request(
                CommandId::TLS_SSL_VERSION,
                4,
                RET_CODE_LEN + VERSION_LEN,
                self.config.sync_timeout,
                |w| {
                    w.put_u32(ssl.id)?;
                    Ok(())
                },
            )
            .await?;
        let mut reader = PayloadReader::new(response.payload());
        let ret = reader.read_i32()?;
        let version = lookup_version(reader.read_bytes(VERSION_LEN)?);
        debug!("TLS: ssl_get_version ret {}", ret);
        Ok(version)
    }

    /// Negotiated DTLS-SRTP protection profile of `ssl`
    pub async fn ssl_get_srtp_profile(&self, ssl: &SslContext) -> Result<i32> {
        self.ensure_initialized()?;

        let response = self
            .request(
                CommandId::TLS_SSL_SRTP_PROFILE,
                4,
                RET_CODE_LEN + 4,
                self.config.sync_timeout,
                |w| {
                    w.put_u32(ssl.id)?;
                    Ok(())
                },
            )
            .await?;
        let mut reader = PayloadReader::new(response.payload());
        let ret = reader.read_i32()?;
        let profile = reader.read_i32()?;
        debug!("TLS: ssl_get_srtp_profile ret {} profile {}", ret, profile);
        Ok(profile)
    }
}

/// Map a NUL padded version field onto the known version names
pub fn lookup_version(field: &[u8]) -> &'static str {
    // The last byte is always treated as the terminator
    let field = &field[..field.len().saturating_sub(1)];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let name = &field[..end];

    KNOWN_VERSIONS
        .iter()
        .find(|known| known.as_bytes() == name)
        .copied()
        .unwrap_or(TLS_UNKNOWN)
}
