use auto_impl::auto_impl;
use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::constant::{ER_QUERY_INTERRUPTED, SQLSTATE_QUERY_INTERRUPTED};
use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    #[error("{0}")]
    DataConversion(String),

    #[error("{0}")]
    UnsupportedNavigation(String),

    #[error("Operation not allowed after ResultSet closed")]
    ClosedResultSet,

    #[error("{0}")]
    InvalidCursorState(String),

    #[error("Result set not updatable: {0}")]
    NotUpdatable(#[from] NotUpdatableReason),

    #[error("Query execution was interrupted")]
    QueryInterrupted,

    #[error(
        "Streaming result set is still active. No statements may be issued until it is fully read or closed"
    )]
    StreamingResultSetActive,

    #[error("{0}")]
    InvalidColumn(String),

    #[error("Server Error: {0}")]
    ServerError(ErrPayload),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A bug in zero-resultset: {0}")]
    LibraryBug(color_eyre::Report),
}

/// Why a result set refused a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotUpdatableReason {
    #[error("result set concurrency is read-only")]
    ReadOnly,

    #[error("streaming result sets cannot be updated")]
    Streaming,

    #[error("column '{0}' does not originate from a base table")]
    NoTable(String),

    #[error("the result set references more than one table")]
    MultipleTables,

    #[error("table '{0}' has no primary key or unique key")]
    NoPrimaryKey(String),

    #[error("key column(s) {columns:?} of table '{table}' are not part of the projection")]
    MissingKeyColumns { table: String, columns: Vec<String> },
}

impl Error {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Error::ProtocolDecode(message.into())
    }

    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Error::DataConversion(message.into())
    }
}

impl From<ErrPayload> for Error {
    fn from(err: ErrPayload) -> Self {
        if err.error_code == ER_QUERY_INTERRUPTED || err.sql_state == SQLSTATE_QUERY_INTERRUPTED {
            Error::QueryInterrupted
        } else {
            Error::ServerError(err)
        }
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes<'a>) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::from(err_payload),
            Err(err) => err,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl<A, S, V> From<zerocopy::ConvertError<A, S, V>> for Error {
    fn from(_: zerocopy::ConvertError<A, S, V>) -> Self {
        Error::decode("byte layout does not match the wire struct")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sees every error a result set hands back to its caller, once.
#[auto_impl(&, Box, Arc)]
pub trait ErrorInterceptor {
    fn intercept(&self, error: &Error);
}
