use std::collections::VecDeque;
use std::io::BufRead;

use auto_impl::auto_impl;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Payload length that signals a continuation packet follows
const MAX_PAYLOAD_LEN: usize = 0xFFFFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }
}

/// Where result-set packets come from.
///
/// The transport (socket, TLS stream, captured trace) lives outside this crate.
/// A streaming result set calls `read_packet` once per row, and that call is the only
/// place the result-set machinery may block.
#[auto_impl(&mut, Box)]
pub trait PacketSource {
    /// Replace `buffer` with the next complete payload.
    fn read_packet(&mut self, buffer: &mut Vec<u8>) -> Result<()>;
}

/// Already-framed payloads, e.g. a captured result set replayed in order.
impl PacketSource for VecDeque<Vec<u8>> {
    fn read_packet(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        let payload = self.pop_front().ok_or_else(|| {
            Error::IoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "packet stream ended before the result set was complete",
            ))
        })?;
        buffer.clear();
        buffer.extend_from_slice(&payload);
        Ok(())
    }
}

/// Frames payloads out of a byte stream.
pub struct PacketReader<R> {
    reader: R,
    last_sequence_id: u8,
}

impl<R: BufRead> PacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            last_sequence_id: 0,
        }
    }

    /// Sequence id of the last packet read
    pub fn last_sequence_id(&self) -> u8 {
        self.last_sequence_id
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> PacketSource for PacketReader<R> {
    fn read_packet(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        self.last_sequence_id = read_payload(&mut self.reader, buffer)?;
        Ok(())
    }
}

/// Read a complete MySQL payload, concatenating packets if they span multiple 16MB chunks
/// Returns the sequence_id of the last packet read.
#[tracing::instrument(skip_all)]
pub fn read_payload<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header = PacketHeader::new_zeroed();
    reader.read_exact(header.as_mut_bytes())?;

    let length = header.length();
    let mut sequence_id = header.sequence_id;

    buffer.resize(length, 0);
    reader.read_exact(&mut buffer[..])?;

    let mut current_length = length;
    while current_length == MAX_PAYLOAD_LEN {
        reader.read_exact(header.as_mut_bytes())?;

        current_length = header.length();
        sequence_id = header.sequence_id;

        let prev_len = buffer.len();
        buffer.resize(prev_len + current_length, 0);
        reader.read_exact(&mut buffer[prev_len..])?;
    }

    Ok(sequence_id)
}

/// Frame `payload` into one or more packets, appending them to `out`.
///
/// Returns the next sequence id.
pub fn write_payload(out: &mut Vec<u8>, mut sequence_id: u8, payload: &[u8]) -> u8 {
    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PAYLOAD_LEN);
        let (chunk, rest) = remaining.split_at(chunk_size);
        out.extend_from_slice(PacketHeader::encode(chunk_size, sequence_id).as_bytes());
        out.extend_from_slice(chunk);
        sequence_id = sequence_id.wrapping_add(1);
        remaining = rest;
        if chunk_size < MAX_PAYLOAD_LEN {
            return sequence_id;
        }
    }
}
