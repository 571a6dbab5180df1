//! Record decoding - one stateless decoder per record family
//!
//! Every decoder takes a borrowed byte span plus the packet's declared record
//! count and returns a `DecodeOutcome`. A bad record is counted and skipped;
//! it never aborts the rest of the packet.
//!
//! - quote: fixed 158-byte stride, 5-level book reassembled from 3 + 2 fields
//! - minute: header/bar mixed stream, one set per header-delimited run
//! - five_minute: 32-byte slots, one flat set per packet
//! - symbol_table: 54-byte header, 44-byte entries

pub mod five_minute;
pub mod layout;
pub mod minute;
pub mod quote;
pub mod reader;
pub mod symbol_table;

pub use five_minute::decode_five_minute_bars;
pub use minute::decode_minute_bars;
pub use quote::decode_quotes;
pub use symbol_table::decode_symbol_table;

use crate::core::RecordFamily;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};
use tracing::Level;

/// Per-record decode failure
///
/// Never escapes a decoder; it is counted in `DecodeOutcome::errors`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("non-finite value in {field}")]
    NonFinite { field: &'static str },

    #[error("code field is not alphanumeric")]
    InvalidCode,

    #[error("timestamp out of range: {0}")]
    Timestamp(i64),
}

/// Records decoded from one packet plus the number of records that failed
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome<T> {
    pub records: Vec<T>,
    pub errors: usize,
}

impl<T> DecodeOutcome<T> {
    #[inline]
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            errors: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T> Default for DecodeOutcome<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Decoder settings shared by all families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Exchange-local offset applied to every epoch timestamp
    pub utc_offset: UtcOffset,
    /// Per-record errors logged per packet before going quiet
    pub max_logged_errors: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            utc_offset: time::macros::offset!(+8),
            max_logged_errors: 3,
        }
    }
}

impl DecodeOptions {
    /// Convert driver epoch seconds to exchange-local time
    #[inline]
    pub fn local_time(&self, epoch_secs: i64) -> Result<OffsetDateTime, DecodeError> {
        OffsetDateTime::from_unix_timestamp(epoch_secs)
            .map(|t| t.to_offset(self.utc_offset))
            .map_err(|_| DecodeError::Timestamp(epoch_secs))
    }

    /// Current time at the exchange-local offset
    #[inline]
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }
}

/// Counts per-record failures and logs only the first few of a packet
pub(crate) struct ErrorTally {
    family: RecordFamily,
    limit: usize,
    count: usize,
}

impl ErrorTally {
    pub(crate) fn new(family: RecordFamily, opts: &DecodeOptions) -> Self {
        Self {
            family,
            limit: opts.max_logged_errors,
            count: 0,
        }
    }

    pub(crate) fn record(&mut self, index: usize, err: &DecodeError) {
        self.count += 1;
        if self.count <= self.limit {
            crate::log_decode!(
                Level::WARN,
                family = %self.family,
                index,
                error = %err,
                "record decode failed"
            );
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Summarize suppressed errors once the packet is done
    pub(crate) fn finish(self) -> usize {
        if self.count > self.limit {
            crate::log_decode!(
                Level::WARN,
                family = %self.family,
                total = self.count,
                suppressed = self.count - self.limit,
                "further record errors suppressed"
            );
        }
        self.count
    }
}

/// A code field must be plain ASCII alphanumerics once padding is trimmed
#[inline]
pub(crate) fn check_code(code: &str) -> Result<(), DecodeError> {
    if code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(DecodeError::InvalidCode)
    }
}

/// Widen f32 wire values, rejecting NaN and infinities
#[inline]
pub(crate) fn finite<const N: usize>(
    field: &'static str,
    values: [f32; N],
) -> Result<[f64; N], DecodeError> {
    let mut out = [0f64; N];
    for (slot, value) in out.iter_mut().zip(values) {
        if !value.is_finite() {
            return Err(DecodeError::NonFinite { field });
        }
        *slot = f64::from(value);
    }
    Ok(out)
}
