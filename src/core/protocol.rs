//! ALTCOM Wire Protocol Definitions
//!
//! This module defines the frame format exchanged with the modem co-processor.
//! Frame format:
//! - Header (16 bytes, big-endian):
//!   [Magic (4)] [Version (1)] [SeqId (1)] [CmdId (2)] [TransId (2)]
//!   [DataLen (2)] [Checksum (2)] [Reserved (2)]
//! - Payload: command specific, fixed layout, multi-byte integers big-endian
//!
//! Responses reuse the request command ID with the response bit set.

use crc::{Crc, CRC_16_IBM_SDLC};

/// Header magic number
pub const MAGIC_NUMBER: u32 = 0xFEED_BAC5;

/// Supported protocol version
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Size of the frame header in bytes
pub const HEADER_LEN: usize = 16;

/// Bit that turns a request ID into its response ID
pub const RESPONSE_BIT: u16 = 1 << 15;

/// Bytes covered by the header checksum
const CHECKSUM_COVERAGE: usize = 12;

const HEADER_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Command identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandId(pub u16);

impl CommandId {
    // LTE control
    pub const POWER_ON: Self = Self(0x0001);
    pub const POWER_OFF: Self = Self(0x0002);
    pub const SET_CE: Self = Self(0x0021);
    pub const DEACTIVATE_PDN: Self = Self(0x0025);
    pub const GET_IMS_CAP: Self = Self(0x0028);
    pub const SET_REP_NETINFO: Self = Self(0x0029);

    // LTE notifications (modem initiated, no request counterpart)
    pub const REPORT_NETINFO: Self = Self(0x0031);
    pub const ERRINFO: Self = Self(0x0034);

    // mbedTLS proxy
    pub const TLS_SSL_SETUP: Self = Self(0x0103);
    pub const TLS_SSL_VERSION: Self = Self(0x0112);
    pub const TLS_SSL_SRTP_PROFILE: Self = Self(0x0116);
    pub const TLS_CONFIG_AUTHMODE: Self = Self(0x0123);
    pub const TLS_CONFIG_CIPHERSUITES: Self = Self(0x012A);
    pub const TLS_PK_INIT: Self = Self(0x0150);
    pub const TLS_PK_WRITE_KEY_PEM: Self = Self(0x0159);
    pub const TLS_CIPHER_UPDATE: Self = Self(0x01A5);

    /// Raw 16-bit value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Response ID matching this request ID
    pub const fn to_response(self) -> Self {
        Self(self.0 | RESPONSE_BIT)
    }

    /// Request ID a response ID answers
    pub const fn to_request(self) -> Self {
        Self(self.0 & !RESPONSE_BIT)
    }

    /// Whether this ID lives in the response space
    pub const fn is_response(self) -> bool {
        self.0 & RESPONSE_BIT != 0
    }
}

/// Protocol error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    InvalidLength,
    InvalidMagic,
    UnsupportedVersion,
    ChecksumMismatch,
    BufferFull,
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandHeader {
    pub seq_id: u8,
    pub cmd_id: CommandId,
    pub trans_id: u16,
    pub data_len: u16,
}

impl CommandHeader {
    /// Create a header for a payload of `data_len` bytes
    pub fn new(cmd_id: CommandId, data_len: u16) -> Self {
        Self {
            seq_id: 0,
            cmd_id,
            trans_id: 0,
            data_len,
        }
    }

    /// Write the header, including its checksum, into `out`
    pub fn encode(&self, out: &mut [u8]) -> Result<(), ProtocolError> {
        let out = out.get_mut(..HEADER_LEN).ok_or(ProtocolError::BufferFull)?;

        out[0..4].copy_from_slice(&MAGIC_NUMBER.to_be_bytes());
        out[4] = PROTOCOL_VERSION;
        out[5] = self.seq_id;
        out[6..8].copy_from_slice(&self.cmd_id.raw().to_be_bytes());
        out[8..10].copy_from_slice(&self.trans_id.to_be_bytes());
        out[10..12].copy_from_slice(&self.data_len.to_be_bytes());

        let checksum = calculate_checksum(&out[..CHECKSUM_COVERAGE]);
        out[12..14].copy_from_slice(&checksum.to_be_bytes());
        out[14..16].copy_from_slice(&[0, 0]);

        Ok(())
    }

    /// Parse and validate a header from the start of `data`
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let header = data.get(..HEADER_LEN).ok_or(ProtocolError::InvalidLength)?;

        let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if magic != MAGIC_NUMBER {
            return Err(ProtocolError::InvalidMagic);
        }

        if header[4] != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion);
        }

        let checksum = u16::from_be_bytes([header[12], header[13]]);
        if !validate_checksum(&header[..CHECKSUM_COVERAGE], checksum) {
            return Err(ProtocolError::ChecksumMismatch);
        }

        Ok(Self {
            seq_id: header[5],
            cmd_id: CommandId(u16::from_be_bytes([header[6], header[7]])),
            trans_id: u16::from_be_bytes([header[8], header[9]]),
            data_len: u16::from_be_bytes([header[10], header[11]]),
        })
    }

    /// Total frame length announced by this header
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.data_len as usize
    }
}

/// CRC16/IBM-SDLC over the header bytes preceding the checksum field
pub fn calculate_checksum(data: &[u8]) -> u16 {
    HEADER_CRC.checksum(data)
}

/// Check a received checksum
pub fn validate_checksum(data: &[u8], checksum: u16) -> bool {
    calculate_checksum(data) == checksum
}

/// Encode a complete frame (header + payload) into `out`, returning its length
pub fn encode_frame(header: &CommandHeader, payload: &[u8], out: &mut [u8]) -> Result<usize, ProtocolError> {
    let total = HEADER_LEN + payload.len();
    if payload.len() != header.data_len as usize {
        return Err(ProtocolError::InvalidLength);
    }
    if out.len() < total {
        return Err(ProtocolError::BufferFull);
    }

    header.encode(out)?;
    out[HEADER_LEN..total].copy_from_slice(payload);

    Ok(total)
}

/// Big-endian payload writer over a fixed command payload
pub struct PayloadWriter<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> PayloadWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    pub fn put_u8(&mut self, value: u8) -> Result<&mut Self, ProtocolError> {
        self.put_slice(&[value])
    }

    pub fn put_u16(&mut self, value: u16) -> Result<&mut Self, ProtocolError> {
        self.put_slice(&value.to_be_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<&mut Self, ProtocolError> {
        self.put_slice(&value.to_be_bytes())
    }

    pub fn put_i32(&mut self, value: i32) -> Result<&mut Self, ProtocolError> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Copy `data` into the next `data.len()` bytes
    pub fn put_slice(&mut self, data: &[u8]) -> Result<&mut Self, ProtocolError> {
        let end = self.pos.checked_add(data.len()).ok_or(ProtocolError::BufferFull)?;
        let dst = self.buffer.get_mut(self.pos..end).ok_or(ProtocolError::BufferFull)?;
        dst.copy_from_slice(data);
        self.pos = end;
        Ok(self)
    }

    /// Copy `data` into a fixed-width field, zero filling the remainder
    pub fn put_padded(&mut self, data: &[u8], width: usize) -> Result<&mut Self, ProtocolError> {
        if data.len() > width {
            return Err(ProtocolError::BufferFull);
        }
        let end = self.pos.checked_add(width).ok_or(ProtocolError::BufferFull)?;
        let dst = self.buffer.get_mut(self.pos..end).ok_or(ProtocolError::BufferFull)?;
        dst.fill(0);
        dst[..data.len()].copy_from_slice(data);
        self.pos = end;
        Ok(self)
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Big-endian payload reader
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.read_u32().map(|v| v as i32)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.pos.checked_add(len).ok_or(ProtocolError::InvalidLength)?;
        let bytes = self.data.get(self.pos..end).ok_or(ProtocolError::InvalidLength)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
