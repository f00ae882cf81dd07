use std::sync::Arc;

use tracing::debug;

use crate::column::ColumnDescriptor;
use crate::decode::Protocol;
use crate::error::{Error, ErrorInterceptor, Result};
use crate::metadata::{MetadataCache, ResultSetMetadata};
use crate::opts::Opts;
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::packet::PacketSource;
use crate::protocol::primitive::read_int_lenenc;
use crate::protocol::response::{
    ErrPayloadBytes, OkPayload, OkPayloadBytes, PacketType, detect_header_type,
    detect_packet_type,
};
use crate::result_set::{Concurrency, ResultSet, ResultSetType};
use crate::store::{MaterializedRowStore, RowPacket, StreamingRowStore, read_row};
use crate::streaming::StreamingToken;

/// How the caller wants the result of one statement read.
#[derive(Debug, Clone, Default)]
pub struct ResultSetRequest {
    /// Statement text, the metadata cache key
    pub sql: String,
    pub protocol: Protocol,
    pub result_set_type: ResultSetType,
    pub concurrency: Concurrency,
    /// Pull rows one at a time instead of reading them all up front
    pub streaming: bool,
}

impl ResultSetRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn binary(mut self) -> Self {
        self.protocol = Protocol::Binary;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.result_set_type = ResultSetType::ScrollInsensitive;
        self
    }

    pub fn updatable(mut self) -> Self {
        self.concurrency = Concurrency::Updatable;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}

/// Connection-scoped state shared by the result sets read through it.
pub struct Session {
    opts: Arc<Opts>,
    metadata_cache: MetadataCache,
    streaming: StreamingToken,
    interceptor: Option<Arc<dyn ErrorInterceptor + Send + Sync>>,
}

impl Session {
    pub fn new(opts: Opts) -> Self {
        Self {
            metadata_cache: MetadataCache::new(opts.metadata_cache_size),
            opts: Arc::new(opts),
            streaming: StreamingToken::new(),
            interceptor: None,
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Whether a streaming result set still owns the wire
    pub fn is_streaming(&self) -> bool {
        self.streaming.is_active()
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.metadata_cache
    }

    /// Installed on every result set read afterwards
    pub fn set_error_interceptor(&mut self, interceptor: Arc<dyn ErrorInterceptor + Send + Sync>) {
        self.interceptor = Some(interceptor);
    }

    /// Read the response to a statement as a result set.
    ///
    /// Column definitions are read (or taken from the metadata cache) before this returns.
    /// Rows are read up front, or on demand when `request.streaming` is set; a streaming
    /// result set holds the session's streaming token until it is exhausted or closed.
    #[tracing::instrument(skip_all)]
    pub fn read_result_set<'a, S: PacketSource + 'a>(
        &mut self,
        mut source: S,
        request: &ResultSetRequest,
    ) -> Result<ResultSet<'a>> {
        if self.streaming.is_active() {
            return Err(Error::StreamingResultSetActive);
        }

        let mut buffer = self.opts.buffer_pool.get_buffer();
        source.read_packet(&mut buffer)?;
        let column_count = match detect_header_type(&buffer)? {
            PacketType::Err => return Err(Error::from(ErrPayloadBytes(&buffer))),
            PacketType::Ok => {
                let ok = OkPayload::try_from(OkPayloadBytes(&buffer))?;
                debug!(affected_rows = ok.affected_rows, "statement produced no result set");
                return Err(Error::BadUsageError(
                    "statement did not produce a result set".to_owned(),
                ));
            }
            PacketType::Eof | PacketType::Data => {
                let (count, _rest) = read_int_lenenc(&buffer)?;
                usize::try_from(count)
                    .map_err(|err| Error::decode(format!("column count {}: {}", count, err)))?
            }
        };

        let metadata = self.read_metadata(&mut source, &mut buffer, column_count, &request.sql)?;

        if !self.opts.deprecate_eof {
            source.read_packet(&mut buffer)?;
            match detect_packet_type(&buffer)? {
                PacketType::Eof => {}
                PacketType::Err => return Err(Error::from(ErrPayloadBytes(&buffer))),
                PacketType::Ok | PacketType::Data => {
                    return Err(Error::decode("expected EOF after column definitions"));
                }
            }
        }

        let mut result_set = if request.streaming {
            let guard = self.streaming.acquire()?;
            debug!(columns = column_count, "streaming result set started");
            let store = StreamingRowStore::new(
                Box::new(source),
                buffer,
                request.protocol,
                metadata.shared(),
                guard,
            );
            ResultSet::streaming(metadata, store, Arc::clone(&self.opts), request.concurrency)
        } else {
            let mut rows = Vec::new();
            let terminator = loop {
                match read_row(&mut source, &mut buffer, request.protocol, metadata.columns())? {
                    RowPacket::Row(row) => rows.push(Arc::new(row)),
                    RowPacket::End(ok) => break ok,
                }
            };
            debug!(rows = rows.len(), columns = column_count, "materialized result set");
            ResultSet::materialized(
                metadata,
                MaterializedRowStore::new(rows, Some(terminator)),
                Arc::clone(&self.opts),
                request.result_set_type,
                request.concurrency,
            )
        };
        if let Some(interceptor) = &self.interceptor {
            result_set.set_error_interceptor(Arc::clone(interceptor));
        }
        Ok(result_set)
    }

    fn read_metadata<S: PacketSource + ?Sized>(
        &mut self,
        source: &mut S,
        buffer: &mut Vec<u8>,
        column_count: usize,
        sql: &str,
    ) -> Result<ResultSetMetadata> {
        let cached = self
            .opts
            .cache_result_set_metadata
            .then(|| self.metadata_cache.get(sql))
            .flatten()
            .filter(|metadata| metadata.column_count() == column_count);

        if let Some(metadata) = cached {
            debug!(sql, "result set metadata cache hit");
            for _ in 0..column_count {
                source.read_packet(buffer)?;
            }
            return Ok(metadata);
        }

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            source.read_packet(buffer)?;
            if detect_packet_type(buffer)? == PacketType::Err {
                return Err(Error::from(ErrPayloadBytes(buffer)));
            }
            columns.push(ColumnDescriptor::try_from(ColumnDefinitionBytes(buffer))?);
        }
        let metadata = ResultSetMetadata::new(columns);
        if self.opts.cache_result_set_metadata {
            self.metadata_cache.insert(sql, metadata.clone());
        }
        Ok(metadata)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("opts", &self.opts)
            .field("cached_statements", &self.metadata_cache.len())
            .field("streaming", &self.streaming.is_active())
            .finish()
    }
}
