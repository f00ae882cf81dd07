use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// What a packet read during a result set is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// OK packet (`0x00`), only recognised where a result set header is expected
    Ok,
    /// ERR packet (`0xFF`)
    Err,
    /// EOF packet, or an OK packet with an `0xFE` header under `CLIENT_DEPRECATE_EOF`
    Eof,
    /// Anything else: a column count, a column definition, or a row
    Data,
}

/// Classify the first packet of a statement response.
pub fn detect_header_type(payload: &[u8]) -> Result<PacketType> {
    match payload.first() {
        None => Err(Error::decode("empty packet")),
        Some(0x00) => Ok(PacketType::Ok),
        Some(0xFF) => Ok(PacketType::Err),
        Some(_) => Ok(PacketType::Data),
    }
}

/// Classify a payload read while a result set is in flight.
///
/// Binary rows start with `0x00`, so OK packets are never recognised here.
/// A text row whose first value is length-prefixed with `0xFE` only collides with the
/// terminator for values of 16MB and more, so the terminator is recognised by its header
/// and a payload shorter than one full packet.
pub fn detect_packet_type(payload: &[u8]) -> Result<PacketType> {
    let Some(&first) = payload.first() else {
        return Err(Error::decode("empty packet"));
    };
    match first {
        0xFF => Ok(PacketType::Err),
        0xFE if payload.len() < 0xFFFFFF => Ok(PacketType::Eof),
        _ => Ok(PacketType::Data),
    }
}

/// OK packet payload
#[derive(Debug)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

/// ERR packet payload
#[derive(Debug)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// OK / EOF packet contents
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        match header {
            // Legacy EOF: warnings, status flags
            0xFE if data.len() == 4 => {
                let (warnings, rest) = read_int_2(data)?;
                let (status_flags, _rest) = read_int_2(rest)?;
                Ok(OkPayload {
                    affected_rows: 0,
                    last_insert_id: 0,
                    status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
                    warnings,
                })
            }
            0x00 | 0xFE => {
                let (affected_rows, rest) = read_int_lenenc(data)?;
                let (last_insert_id, rest) = read_int_lenenc(rest)?;
                let (status_flags, rest) = read_int_2(rest)?;
                let (warnings, _rest) = read_int_2(rest)?;
                Ok(OkPayload {
                    affected_rows,
                    last_insert_id,
                    status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
                    warnings,
                })
            }
            other => Err(Error::decode(format!(
                "expected OK or EOF packet, got header 0x{:02X}",
                other
            ))),
        }
    }
}

/// ERR packet response
#[derive(Debug, Clone, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::decode(format!(
                "expected ERR packet, got header 0x{:02X}",
                header
            )));
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state marker '#'
        let (sql_state, rest) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state_bytes, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}
