//! Where the rows of a result set live.
//!
//! [`MaterializedRowStore`] holds every row, read before the result set is handed out.
//! [`StreamingRowStore`] keeps only the current row and pulls the next one from the
//! packet source on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::buffer_pool::PooledBuffer;
use crate::column::ColumnDescriptor;
use crate::decode::{Protocol, decode_row};
use crate::error::{Error, Result};
use crate::protocol::packet::PacketSource;
use crate::protocol::response::{
    ErrPayloadBytes, OkPayload, OkPayloadBytes, PacketType, detect_packet_type,
};
use crate::row::Row;
use crate::streaming::StreamingGuard;

pub trait RowStore {
    fn is_streaming(&self) -> bool;

    /// Number of rows, `None` while a stream still has unread rows
    fn size(&self) -> Option<usize>;

    /// Number of rows read from the wire so far
    fn rows_seen(&self) -> usize;

    /// Row at a 0-based index, if the store still holds it
    fn get(&self, idx: usize) -> Option<&Arc<Row>>;

    /// Read one more row from the wire. `Ok(false)` once the result set is exhausted.
    fn fetch_next(&mut self) -> Result<bool>;

    /// The EOF/OK packet that ended the rows, once it has been read
    fn terminator(&self) -> Option<&OkPayload>;

    /// Read and discard whatever is left on the wire
    fn drain(&mut self) -> Result<()>;

    fn materialized_mut(&mut self) -> Option<&mut MaterializedRowStore> {
        None
    }
}

/// Every row of a result set, in server order.
#[derive(Debug, Default)]
pub struct MaterializedRowStore {
    rows: Vec<Arc<Row>>,
    terminator: Option<OkPayload>,
}

impl MaterializedRowStore {
    pub fn new(rows: Vec<Arc<Row>>, terminator: Option<OkPayload>) -> Self {
        Self { rows, terminator }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    /// Swap in a new version of a row. Holders of the old `Arc` keep seeing the old row.
    pub fn replace(&mut self, idx: usize, row: Row) -> Result<()> {
        let slot = self
            .rows
            .get_mut(idx)
            .ok_or_else(|| Error::InvalidCursorState(format!("no row at index {}", idx)))?;
        *slot = Arc::new(row);
        Ok(())
    }

    /// Append a row, returning its index
    pub fn push(&mut self, row: Row) -> usize {
        self.rows.push(Arc::new(row));
        self.rows.len() - 1
    }

    /// Remove a row; later rows shift down by one
    pub fn remove(&mut self, idx: usize) -> Result<Arc<Row>> {
        if idx >= self.rows.len() {
            return Err(Error::InvalidCursorState(format!("no row at index {}", idx)));
        }
        Ok(self.rows.remove(idx))
    }
}

impl RowStore for MaterializedRowStore {
    fn is_streaming(&self) -> bool {
        false
    }

    fn size(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn rows_seen(&self) -> usize {
        self.rows.len()
    }

    fn get(&self, idx: usize) -> Option<&Arc<Row>> {
        self.rows.get(idx)
    }

    fn fetch_next(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn terminator(&self) -> Option<&OkPayload> {
        self.terminator.as_ref()
    }

    fn drain(&mut self) -> Result<()> {
        Ok(())
    }

    fn materialized_mut(&mut self) -> Option<&mut MaterializedRowStore> {
        Some(self)
    }
}

/// One packet of a result set body
#[derive(Debug)]
pub(crate) enum RowPacket {
    Row(Row),
    End(OkPayload),
}

/// Read the next packet of a result set body.
pub(crate) fn read_row<S: PacketSource + ?Sized>(
    source: &mut S,
    buffer: &mut Vec<u8>,
    protocol: Protocol,
    columns: &[ColumnDescriptor],
) -> Result<RowPacket> {
    source.read_packet(buffer)?;
    match detect_packet_type(buffer)? {
        PacketType::Err => Err(Error::from(ErrPayloadBytes(buffer))),
        PacketType::Eof | PacketType::Ok => {
            Ok(RowPacket::End(OkPayload::try_from(OkPayloadBytes(buffer))?))
        }
        PacketType::Data => {
            let row = decode_row(protocol, buffer, columns)?;
            trace!(columns = row.len(), "decoded row");
            Ok(RowPacket::Row(row))
        }
    }
}

#[derive(Debug)]
enum StreamState {
    Open,
    Finished(OkPayload),
    /// A fetch was aborted; the error is repeated on every later fetch
    Interrupted,
    /// Reading failed; the stream can no longer be trusted
    Broken,
}

/// Rows pulled one at a time from the packet source.
pub struct StreamingRowStore<'a> {
    source: Box<dyn PacketSource + 'a>,
    buffer: PooledBuffer,
    protocol: Protocol,
    columns: Arc<[ColumnDescriptor]>,
    current: Option<(usize, Arc<Row>)>,
    fetched: usize,
    state: StreamState,
    interrupted: Arc<AtomicBool>,
    guard: StreamingGuard,
}

impl<'a> StreamingRowStore<'a> {
    pub fn new(
        source: Box<dyn PacketSource + 'a>,
        buffer: PooledBuffer,
        protocol: Protocol,
        columns: Arc<[ColumnDescriptor]>,
        guard: StreamingGuard,
    ) -> Self {
        Self {
            source,
            buffer,
            protocol,
            columns,
            current: None,
            fetched: 0,
            state: StreamState::Open,
            interrupted: Arc::new(AtomicBool::new(false)),
            guard,
        }
    }

    /// Flag checked before every fetch; setting it makes the next fetch fail with
    /// [`Error::QueryInterrupted`].
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn guard(&self) -> &StreamingGuard {
        &self.guard
    }

    fn finish(&mut self, state: StreamState) {
        self.current = None;
        self.state = state;
        self.guard.release();
    }
}

impl RowStore for StreamingRowStore<'_> {
    fn is_streaming(&self) -> bool {
        true
    }

    fn size(&self) -> Option<usize> {
        match self.state {
            StreamState::Finished(_) => Some(self.fetched),
            _ => None,
        }
    }

    fn rows_seen(&self) -> usize {
        self.fetched
    }

    fn get(&self, idx: usize) -> Option<&Arc<Row>> {
        match &self.current {
            Some((i, row)) if *i == idx => Some(row),
            _ => None,
        }
    }

    fn fetch_next(&mut self) -> Result<bool> {
        match self.state {
            StreamState::Open => {}
            StreamState::Finished(_) => return Ok(false),
            StreamState::Interrupted => return Err(Error::QueryInterrupted),
            StreamState::Broken => {
                return Err(Error::BadUsageError(
                    "streaming result set failed earlier and cannot be read further".to_owned(),
                ));
            }
        }
        if self.interrupted.load(Ordering::Acquire) {
            self.finish(StreamState::Interrupted);
            return Err(Error::QueryInterrupted);
        }

        match read_row(
            self.source.as_mut(),
            &mut self.buffer,
            self.protocol,
            &self.columns,
        ) {
            Ok(RowPacket::Row(row)) => {
                self.current = Some((self.fetched, Arc::new(row)));
                self.fetched += 1;
                Ok(true)
            }
            Ok(RowPacket::End(terminator)) => {
                debug!(rows = self.fetched, "streaming result set exhausted");
                self.finish(StreamState::Finished(terminator));
                Ok(false)
            }
            Err(Error::QueryInterrupted) => {
                self.finish(StreamState::Interrupted);
                Err(Error::QueryInterrupted)
            }
            Err(err) => {
                self.finish(StreamState::Broken);
                Err(err)
            }
        }
    }

    fn terminator(&self) -> Option<&OkPayload> {
        match &self.state {
            StreamState::Finished(ok) => Some(ok),
            _ => None,
        }
    }

    fn drain(&mut self) -> Result<()> {
        if !matches!(self.state, StreamState::Open) {
            return Ok(());
        }
        // Rows already on the wire are read even if an interrupt was requested
        self.interrupted.store(false, Ordering::Release);
        let mut discarded = 0usize;
        while self.fetch_next()? {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "drained streaming result set");
        }
        Ok(())
    }
}

impl Drop for StreamingRowStore<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.drain() {
            warn!(error = %err, "discarding unread streaming rows failed");
        }
    }
}
