//! Minute-bar family decoder
//!
//! The payload is a mixed stream: a slot is either a 16-byte framed header
//! (tag == `HEADER_SENTINEL`) naming the code for the bars that follow, or a
//! 16-byte bar. Each header closes the previous run, so one packet can yield
//! several `MinuteBarSet`s. The declared count counts slots; headers
//! consume it exactly like bars.

use super::layout::{
    data_type, CODE_WIDTH, FRAME_HEADER_CODE, FRAME_HEADER_SIZE, HEADER_SENTINEL, MINUTE_BAR_SIZE,
};
use super::reader::{peek_u32, ByteReader};
use super::{check_code, finite, DecodeError, DecodeOptions, DecodeOutcome, ErrorTally};
use crate::core::{code, MinuteBar, MinuteBarSet, RecordFamily};

/// Accumulates bars for the code named by the most recent header
struct Run {
    code: String,
    bars: Vec<MinuteBar>,
}

impl Run {
    /// Emit the run if it holds any bars
    fn flush_into(self, out: &mut Vec<MinuteBarSet>) {
        if !self.bars.is_empty() {
            out.push(MinuteBarSet {
                code: self.code,
                bars: self.bars,
            });
        }
    }
}

/// Decode a minute stream of `count` slots
///
/// A no-op unless `type_tag` is the minute data type. Bars that arrive before any
/// header has named a code are dropped silently.
pub fn decode_minute_bars(
    data: &[u8],
    type_tag: u16,
    count: usize,
    opts: &DecodeOptions,
) -> DecodeOutcome<MinuteBarSet> {
    if type_tag != data_type::MINUTE {
        return DecodeOutcome::empty();
    }

    let mut sets = Vec::new();
    let mut tally = ErrorTally::new(RecordFamily::MinuteBar, opts);
    let mut current: Option<Run> = None;
    let mut offset = 0usize;

    for slot in 0..count {
        let tag = match peek_u32(data, offset) {
            Ok(tag) => tag,
            Err(e) => {
                // Stream ended before the declared count; later slots cannot be located
                tally.record(slot, &e);
                break;
            }
        };

        if tag == HEADER_SENTINEL {
            if let Some(run) = current.take() {
                run.flush_into(&mut sets);
            }
            match decode_header(data, offset) {
                Ok(Some(code)) => {
                    current = Some(Run {
                        code,
                        bars: Vec::new(),
                    })
                }
                Ok(None) => {}
                Err(e @ DecodeError::Truncated { .. }) => {
                    tally.record(slot, &e);
                    break;
                }
                Err(e) => tally.record(slot, &e),
            }
            offset += FRAME_HEADER_SIZE;
            continue;
        }

        if let Some(run) = current.as_mut() {
            match decode_bar(data, offset, &run.code, opts) {
                Ok(bar) => run.bars.push(bar),
                Err(e) => tally.record(slot, &e),
            }
        }
        offset += MINUTE_BAR_SIZE;
    }

    if let Some(run) = current {
        run.flush_into(&mut sets);
    }

    DecodeOutcome {
        records: sets,
        errors: tally.finish(),
    }
}

/// Normalized code carried by a framed header; `None` when the field is blank
pub(crate) fn decode_header(data: &[u8], offset: usize) -> Result<Option<String>, DecodeError> {
    let mut r = ByteReader::at(data, offset);
    r.require(FRAME_HEADER_SIZE)?;
    r.skip(FRAME_HEADER_CODE)?;
    let raw = r.fixed_str(CODE_WIDTH)?;
    if raw.is_empty() {
        return Ok(None);
    }
    check_code(&raw)?;
    Ok(Some(code::normalize(&raw)))
}

fn decode_bar(
    data: &[u8],
    offset: usize,
    code: &str,
    opts: &DecodeOptions,
) -> Result<MinuteBar, DecodeError> {
    let mut r = ByteReader::at(data, offset);
    r.require(MINUTE_BAR_SIZE)?;
    let time = opts.local_time(i64::from(r.u32()?))?;
    let [price, volume, amount] = finite("minute bar", r.f32_array::<3>()?)?;
    Ok(MinuteBar {
        code: code.to_string(),
        time,
        price,
        volume,
        amount,
    })
}
