use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use smart_default::SmartDefault;

use crate::buffer_pool::{BufferPool, GLOBAL_BUFFER_POOL};

/// What to do with `0000-00-00` dates when a temporal value is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDateTimeBehavior {
    /// Return SQL NULL
    ConvertToNull,
    /// Fail with a conversion error
    #[default]
    Exception,
    /// Round up to `0001-01-01 00:00:00`
    Round,
}

/// Result set behaviour of a session
///
/// ```rs
/// let mut opts = Opts::default();
/// opts.jdbc_compliant_truncation = false;
/// opts.connection_time_zone = FixedOffset::east_opt(9 * 3600).unwrap();
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    /// Fail narrowing numeric conversions that do not fit instead of truncating them
    #[default = true]
    pub jdbc_compliant_truncation: bool,

    /// Read `''` as zero through numeric accessors; `false` makes it a conversion error
    #[default = true]
    pub empty_strings_convert_to_zero: bool,

    pub zero_date_time_behavior: ZeroDateTimeBehavior,

    /// TIMESTAMP values are instants in `connection_time_zone` rather than wall-clock values
    #[default = true]
    pub preserve_instants: bool,

    /// Time zone of the server session
    #[default(Utc.fix())]
    pub connection_time_zone: FixedOffset,

    /// Client time zone used when an accessor is not given one
    #[default(Utc.fix())]
    pub default_time_zone: FixedOffset,

    /// Drop fractional seconds the target cannot hold instead of rounding them
    pub truncate_fractional_seconds: bool,

    /// Forward-only result sets answer backward or absolute navigation with `false`
    /// instead of an error
    pub scroll_tolerant_forward_only: bool,

    /// Reuse column descriptors of statements with identical text
    pub cache_result_set_metadata: bool,

    /// Number of statements whose metadata is cached
    #[default = 50]
    pub metadata_cache_size: usize,

    /// Report `TINYINT(1)` columns as booleans from `get_object`
    #[default = true]
    pub tiny_int1_is_bit: bool,

    /// The server omits the EOF packet after column definitions (`CLIENT_DEPRECATE_EOF`)
    #[default = true]
    pub deprecate_eof: bool,

    #[default(Arc::clone(&GLOBAL_BUFFER_POOL))]
    pub buffer_pool: Arc<BufferPool>,
}
