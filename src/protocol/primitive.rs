use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE, U64 as U64LE};

fn need(data: &[u8], len: usize) -> Result<()> {
    if data.len() < len {
        return Err(Error::decode(format!(
            "unexpected end of buffer: need {} bytes, {} remaining",
            len,
            data.len()
        )));
    }
    Ok(())
}

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    need(data, 1)?;
    Ok((data[0], &data[1..]))
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    need(data, 2)?;
    let value = U16LE::ref_from_bytes(&data[..2])?.get();
    Ok((value, &data[2..]))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    need(data, 3)?;
    let value = u32::from_le_bytes([data[0], data[1], data[2], 0]);
    Ok((value, &data[3..]))
}

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    need(data, 4)?;
    let value = U32LE::ref_from_bytes(&data[..4])?.get();
    Ok((value, &data[4..]))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    need(data, 8)?;
    let value = U64LE::ref_from_bytes(&data[..8])?.get();
    Ok((value, &data[8..]))
}

/// Read length-encoded integer
///
/// `0xFB` (NULL in text rows) and `0xFF` are not integers and are rejected here;
/// callers that accept NULL check for the marker first.
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (first, rest) = read_int_1(data)?;
    match first {
        0xFC => {
            let (val, rest) = read_int_2(rest)?;
            Ok((val as u64, rest))
        }
        0xFD => {
            let (val, rest) = read_int_3(rest)?;
            Ok((val as u64, rest))
        }
        0xFE => read_int_8(rest),
        0xFB | 0xFF => Err(Error::decode(format!(
            "invalid length-encoded integer prefix 0x{:02X}",
            first
        ))),
        val => Ok((val as u64, rest)),
    }
}

/// Read fixed-length string
pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    need(data, len)?;
    Ok((&data[..len], &data[len..]))
}

/// Read length-encoded string
///
/// Fails when the length prefix claims more bytes than the buffer holds.
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    let len = usize::try_from(len)
        .map_err(|e| Error::decode(format!("length prefix {} does not fit: {}", len, e)))?;
    read_string_fix(rest, len)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xfc);
        write_int_2(out, value as u16);
    } else if value < (1 << 24) {
        out.push(0xfd);
        write_int_3(out, value as u32);
    } else {
        out.push(0xfe);
        write_int_8(out, value);
    }
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}

/// Write length-encoded string
pub fn write_string_lenenc(out: &mut Vec<u8>, s: &str) {
    write_bytes_lenenc(out, s.as_bytes());
}
