//! Quote family decoder
//!
//! Fixed 158-byte stride. Levels 1-3 of each ladder are stored as inline
//! arrays, levels 4 and 5 as trailing named fields; both are folded back into
//! one ordered 5-level ladder here.

use super::layout::{quote as off, CODE_WIDTH, NAME_WIDTH, QUOTE_RECORD_SIZE};
use super::reader::ByteReader;
use super::{check_code, finite, DecodeError, DecodeOptions, DecodeOutcome, ErrorTally};
use crate::core::{code, Ladder, OrderBook, Quote, RecordFamily};
use time::OffsetDateTime;

/// Decode `count` quote records from `data`
///
/// Records with an empty code are skipped without counting an error.
pub fn decode_quotes(data: &[u8], count: usize, opts: &DecodeOptions) -> DecodeOutcome<Quote> {
    let received_at = opts.now();
    let mut records = Vec::with_capacity(count.min(data.len() / QUOTE_RECORD_SIZE + 1));
    let mut tally = ErrorTally::new(RecordFamily::Quote, opts);

    for index in 0..count {
        let Some(offset) = index.checked_mul(QUOTE_RECORD_SIZE) else {
            tally.record(index, &DecodeError::Truncated {
                offset: usize::MAX,
                needed: QUOTE_RECORD_SIZE,
                available: 0,
            });
            continue;
        };
        match decode_record(data, offset, received_at) {
            Ok(Some(quote)) => records.push(quote),
            Ok(None) => {}
            Err(e) => tally.record(index, &e),
        }
    }

    DecodeOutcome {
        records,
        errors: tally.finish(),
    }
}

fn decode_record(
    data: &[u8],
    offset: usize,
    received_at: OffsetDateTime,
) -> Result<Option<Quote>, DecodeError> {
    let mut r = ByteReader::at(data, offset);
    r.require(QUOTE_RECORD_SIZE)?;

    r.skip(off::TRADE_TIME - off::RECORD_SIZE)?;
    let trade_time = r.i32()?;
    let market = r.u16()?;
    let raw_code = r.fixed_str(CODE_WIDTH)?;
    if raw_code.is_empty() {
        return Ok(None);
    }
    check_code(&raw_code)?;
    let name = r.fixed_str(NAME_WIDTH)?;

    let [last_close, open, high, low, price, volume, amount] = finite("prices", r.f32_array::<7>()?)?;

    let bid_prices = finite("bid prices", r.f32_array::<3>()?)?;
    let bid_volumes = finite("bid volumes", r.f32_array::<3>()?)?;
    let ask_prices = finite("ask prices", r.f32_array::<3>()?)?;
    let ask_volumes = finite("ask volumes", r.f32_array::<3>()?)?;
    let level_4 = finite("level 4", r.f32_array::<4>()?)?;
    let level_5 = finite("level 5", r.f32_array::<4>()?)?;

    let mut quote = Quote::new(code::normalize(&raw_code));
    quote.name = name;
    quote.market = market;
    quote.trade_time = trade_time;
    quote.updated_at = received_at;
    quote.last_close = last_close;
    quote.open = open;
    quote.high = high;
    quote.low = low;
    quote.price = price;
    quote.volume = volume;
    quote.amount = amount;
    quote.book = OrderBook {
        bids: assemble_ladder(bid_prices, bid_volumes, [level_4[0], level_4[1]], [level_5[0], level_5[1]]),
        asks: assemble_ladder(ask_prices, ask_volumes, [level_4[2], level_4[3]], [level_5[2], level_5[3]]),
    };
    quote.recompute_derived();

    Ok(Some(quote))
}

/// Fold levels 1-3 plus the level 4 and 5 (price, volume) pairs into one ladder
#[inline]
fn assemble_ladder(
    prices: [f64; 3],
    volumes: [f64; 3],
    level_4: [f64; 2],
    level_5: [f64; 2],
) -> Ladder {
    Ladder {
        prices: [prices[0], prices[1], prices[2], level_4[0], level_5[0]],
        volumes: [volumes[0], volumes[1], volumes[2], level_4[1], level_5[1]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::layout;
    use crate::test_utils::{quote_packet, QuoteRecord};

    fn close(a: f64, b: f32) -> bool {
        (a - f64::from(b)).abs() < 1e-4
    }

    #[test]
    fn test_decodes_every_well_formed_record() {
        let records = vec![
            QuoteRecord::new("600000", "浦发银行", 10.0),
            QuoteRecord::new("000001", "平安银行", 12.5),
            QuoteRecord::new("SZ300750", "宁德时代", 180.0),
        ];
        let data = quote_packet(&records);
        let outcome = decode_quotes(&data, records.len(), &DecodeOptions::default());

        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.records.len(), 3);
        let codes: Vec<_> = outcome.records.iter().map(|q| q.code.as_str()).collect();
        assert_eq!(codes, ["SH600000", "SZ000001", "SZ300750"]);
        assert_eq!(outcome.records[0].name, "浦发银行");
    }

    #[test]
    fn test_book_levels_reassembled_in_order() {
        let record = QuoteRecord::new("600000", "X", 10.0);
        let data = quote_packet(std::slice::from_ref(&record));
        let quote = &decode_quotes(&data, 1, &DecodeOptions::default()).records[0];

        for level in 0..5 {
            assert!(close(quote.book.bids.prices[level], record.bid_prices[level]));
            assert!(close(quote.book.bids.volumes[level], record.bid_volumes[level]));
            assert!(close(quote.book.asks.prices[level], record.ask_prices[level]));
            assert!(close(quote.book.asks.volumes[level], record.ask_volumes[level]));
        }
    }

    #[test]
    fn test_fields_and_derived_values() {
        let record = QuoteRecord::new("600000", "X", 10.0);
        let data = quote_packet(std::slice::from_ref(&record));
        let quote = &decode_quotes(&data, 1, &DecodeOptions::default()).records[0];

        assert_eq!(quote.market, record.market);
        assert_eq!(quote.trade_time, record.trade_time);
        assert!(close(quote.last_close, 9.5));
        assert!(close(quote.price, 10.0));
        assert!(close(quote.volume, 12_000.0));
        assert!((quote.change_amount() - 0.5).abs() < 1e-4);
        assert!((quote.change_percent() - 0.5 / 9.5 * 100.0).abs() < 1e-3);
        assert_eq!(quote.updated_at.offset().whole_hours(), 8);
    }

    #[test]
    fn test_empty_code_skipped_without_error() {
        let records = vec![
            QuoteRecord::new("600000", "A", 10.0),
            QuoteRecord::new("", "padding", 0.0),
        ];
        let data = quote_packet(&records);
        let outcome = decode_quotes(&data, 2, &DecodeOptions::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors, 0);
    }

    #[test]
    fn test_garbage_record_is_isolated() {
        let records: Vec<_> = (0..5)
            .map(|i| QuoteRecord::new(&format!("60000{i}"), "N", 10.0 + i as f32))
            .collect();
        let mut data = quote_packet(&records);
        let code_at = 2 * QUOTE_RECORD_SIZE + layout::quote::CODE;
        data[code_at..code_at + 4].copy_from_slice(&[0xFF, 0xFE, 0x01, 0x80]);

        let outcome = decode_quotes(&data, 5, &DecodeOptions::default());
        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.errors, 1);
        assert!(outcome.records.iter().all(|q| q.code != "SH600002"));
    }

    #[test]
    fn test_non_finite_price_is_isolated() {
        let mut bad = QuoteRecord::new("600001", "B", 10.0);
        bad.prices[4] = f32::NAN;
        let records = vec![QuoteRecord::new("600000", "A", 10.0), bad];
        let data = quote_packet(&records);

        let outcome = decode_quotes(&data, 2, &DecodeOptions::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors, 1);
    }

    #[test]
    fn test_truncated_tail_counts_one_error() {
        let records: Vec<_> = (0..3)
            .map(|i| QuoteRecord::new(&format!("00000{i}"), "N", 5.0))
            .collect();
        let mut data = quote_packet(&records);
        data.truncate(data.len() - 10);

        let outcome = decode_quotes(&data, 3, &DecodeOptions::default());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.errors, 1);
    }

    #[test]
    fn test_declared_count_beyond_buffer() {
        let data = quote_packet(&[QuoteRecord::new("600000", "A", 10.0)]);
        let outcome = decode_quotes(&data, 4, &DecodeOptions::default());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.errors, 3);
    }

    #[test]
    fn test_zero_count_reads_nothing() {
        let data = quote_packet(&[QuoteRecord::new("600000", "A", 10.0)]);
        let outcome = decode_quotes(&data, 0, &DecodeOptions::default());
        assert!(outcome.is_empty());
        assert_eq!(outcome.errors, 0);
    }
}
