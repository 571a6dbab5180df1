//! Five-minute-bar family decoder
//!
//! Every slot is 32 bytes wide, header or bar. Unlike the minute stream, a
//! header does not close a run: all bars of the packet go into one flat set
//! tagged with the last code seen.

use super::layout::{data_type, FIVE_MINUTE_STRIDE, HEADER_SENTINEL};
use super::minute::decode_header;
use super::reader::{peek_u32, ByteReader};
use super::{finite, DecodeError, DecodeOptions, DecodeOutcome, ErrorTally};
use crate::core::{FiveMinuteBar, FiveMinuteBarSet, RecordFamily};

/// Decode a 5-minute stream of `count` slots
///
/// A no-op unless `type_tag` is the five-minute data type. Produces at most
/// one set per packet.
pub fn decode_five_minute_bars(
    data: &[u8],
    type_tag: u16,
    count: usize,
    opts: &DecodeOptions,
) -> DecodeOutcome<FiveMinuteBarSet> {
    if type_tag != data_type::FIVE_MINUTE {
        return DecodeOutcome::empty();
    }

    let mut bars = Vec::new();
    let mut tally = ErrorTally::new(RecordFamily::FiveMinuteBar, opts);
    let mut last_code: Option<String> = None;

    for slot in 0..count {
        let Some(offset) = slot.checked_mul(FIVE_MINUTE_STRIDE) else {
            break;
        };
        let tag = match peek_u32(data, offset) {
            Ok(tag) => tag,
            Err(e) => {
                tally.record(slot, &e);
                break;
            }
        };

        let decoded = if tag == HEADER_SENTINEL {
            // A blank header clears the current code
            decode_header(data, offset).map(|code| last_code = code)
        } else if let Some(code) = last_code.as_deref() {
            decode_bar(data, offset, code, opts).map(|bar| bars.push(bar))
        } else {
            // No code to attribute the bar to
            Ok(())
        };
        if let Err(e) = decoded {
            tally.record(slot, &e);
        }
    }

    let errors = tally.finish();
    let records = match last_code {
        Some(code) if !bars.is_empty() => vec![FiveMinuteBarSet { code, bars }],
        _ => Vec::new(),
    };
    DecodeOutcome { records, errors }
}

fn decode_bar(
    data: &[u8],
    offset: usize,
    code: &str,
    opts: &DecodeOptions,
) -> Result<FiveMinuteBar, DecodeError> {
    let mut r = ByteReader::at(data, offset);
    r.require(FIVE_MINUTE_STRIDE)?;
    let time = opts.local_time(i64::from(r.u32()?))?;
    let [open, high, low, close, volume, amount, active_buy_volume] =
        finite("five-minute bar", r.f32_array::<7>()?)?;
    Ok(FiveMinuteBar {
        code: code.to_string(),
        time,
        open,
        high,
        low,
        close,
        volume,
        amount,
        active_buy_volume,
    })
}
