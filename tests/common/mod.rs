#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use zero_resultset::column::ColumnDescriptor;
use zero_resultset::decode::{encode_binary_row, encode_text_row};
use zero_resultset::error::{Error, ErrorInterceptor};
use zero_resultset::protocol::primitive::{write_int_1, write_int_2, write_int_lenenc};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .init();
    });
}

/// Server response to a query, one payload per packet.
pub struct Packets {
    packets: VecDeque<Vec<u8>>,
}

impl Packets {
    /// Column count and definitions, without the legacy EOF
    pub fn new(columns: &[ColumnDescriptor]) -> Self {
        let mut packets = VecDeque::new();
        let mut count = Vec::new();
        write_int_lenenc(&mut count, columns.len() as u64);
        packets.push_back(count);
        for column in columns {
            let mut def = Vec::new();
            column.write_definition(&mut def);
            packets.push_back(def);
        }
        Self { packets }
    }

    /// Legacy EOF after the column definitions
    pub fn eof(mut self) -> Self {
        self.packets.push_back(vec![0xFE, 0x00, 0x00, 0x02, 0x00]);
        self
    }

    pub fn text_row(mut self, values: &[Option<&str>]) -> Self {
        let values: Vec<Option<&[u8]>> = values.iter().map(|v| v.map(str::as_bytes)).collect();
        let mut payload = Vec::new();
        encode_text_row(&mut payload, &values);
        self.packets.push_back(payload);
        self
    }

    pub fn binary_row(mut self, values: &[Option<&[u8]>]) -> Self {
        let mut payload = Vec::new();
        encode_binary_row(&mut payload, values);
        self.packets.push_back(payload);
        self
    }

    /// OK packet with a `0xFE` header ending the rows
    pub fn end(self) -> VecDeque<Vec<u8>> {
        self.end_with(0x0002, 0)
    }

    pub fn end_with(mut self, status_flags: u16, warnings: u16) -> VecDeque<Vec<u8>> {
        let mut payload = vec![0xFE, 0x00, 0x00];
        write_int_2(&mut payload, status_flags);
        write_int_2(&mut payload, warnings);
        self.packets.push_back(payload);
        self.packets
    }

    /// ERR packet in place of the next row
    pub fn error(mut self, code: u16, sql_state: &str, message: &str) -> VecDeque<Vec<u8>> {
        self.packets.push_back(err_packet(code, sql_state, message));
        self.packets
    }

    pub fn unterminated(self) -> VecDeque<Vec<u8>> {
        self.packets
    }
}

pub fn err_packet(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    write_int_1(&mut payload, 0xFF);
    write_int_2(&mut payload, code);
    payload.push(b'#');
    payload.extend_from_slice(sql_state.as_bytes());
    payload.extend_from_slice(message.as_bytes());
    payload
}

pub fn ok_packet(affected_rows: u64, last_insert_id: u64) -> Vec<u8> {
    let mut payload = vec![0x00];
    write_int_lenenc(&mut payload, affected_rows);
    write_int_lenenc(&mut payload, last_insert_id);
    write_int_2(&mut payload, 0x0002);
    write_int_2(&mut payload, 0);
    payload
}

/// Collects the messages of intercepted errors
#[derive(Default)]
pub struct Recorder {
    pub seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn interceptor(self: &Arc<Self>) -> Arc<dyn ErrorInterceptor + Send + Sync> {
        let recorder: Arc<Recorder> = Arc::clone(self);
        recorder
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

impl ErrorInterceptor for Recorder {
    fn intercept(&self, error: &Error) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(error.to_string());
        }
    }
}
