pub mod buffer_pool;
pub mod coerce;
pub mod column;
pub mod constant;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod metadata;
mod opts;
pub mod protocol;
pub mod result_set;
pub mod row;
pub mod session;
pub mod store;
pub mod streaming;
pub mod updatable;
pub mod value;

pub use coerce::{Converted, Target};
pub use column::ColumnDescriptor;
pub use error::{Error, ErrorInterceptor, NotUpdatableReason, Result};
pub use metadata::ResultSetMetadata;
pub use opts::{Opts, ZeroDateTimeBehavior};
pub use result_set::{
    CloseHandle, ColumnIndex, Concurrency, InterruptHandle, ResultSet, ResultSetType,
};
pub use session::{ResultSetRequest, Session};
pub use value::Value;

#[cfg(test)]
mod constant_test;
