//! Symbol table family decoder
//!
//! A 54-byte market header (market, market name, trading sessions, entry
//! count) followed by 44-byte code/name entries. Keys stay raw here; the cache
//! normalizes them on merge.

use super::layout::{
    symbol_table as hdr, CODE_WIDTH, NAME_WIDTH, SYMBOL_TABLE_ENTRIES_OFFSET,
    SYMBOL_TABLE_ENTRY_SIZE,
};
use super::reader::ByteReader;
use super::{DecodeError, DecodeOptions, DecodeOutcome, ErrorTally};
use crate::core::{RecordFamily, SymbolTable};
use tracing::Level;

/// Entry count declared in the table header, if the header is present
pub fn declared_entries(data: &[u8]) -> Option<u16> {
    ByteReader::at(data, hdr::ENTRY_COUNT).u16().ok()
}

fn decode_header(data: &[u8]) -> Result<(SymbolTable, usize), DecodeError> {
    ByteReader::new(data).require(SYMBOL_TABLE_ENTRIES_OFFSET)?;
    let mut r = ByteReader::at(data, hdr::MARKET);
    let market = r.u16()?;
    let market_name = r.fixed_str(hdr::MARKET_NAME_WIDTH)?;
    r.skip(hdr::ENTRY_COUNT - hdr::MARKET_NAME - hdr::MARKET_NAME_WIDTH)?;
    let count = usize::from(r.u16()?);
    let table = SymbolTable {
        market,
        market_name,
        ..SymbolTable::default()
    };
    Ok((table, count))
}

/// Decode a symbol table packet
///
/// Yields at most one table. Entries with an empty code or an empty name are
/// skipped; a header that cannot be read yields nothing.
pub fn decode_symbol_table(data: &[u8], opts: &DecodeOptions) -> DecodeOutcome<SymbolTable> {
    let (mut table, count) = match decode_header(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            crate::log_decode!(Level::ERROR, error = %e, "symbol table header unreadable");
            return DecodeOutcome::empty();
        }
    };

    let mut tally = ErrorTally::new(RecordFamily::SymbolTable, opts);
    for index in 0..count {
        let offset = SYMBOL_TABLE_ENTRIES_OFFSET + index * SYMBOL_TABLE_ENTRY_SIZE;
        let mut r = ByteReader::at(data, offset);
        let entry = r.require(SYMBOL_TABLE_ENTRY_SIZE).and_then(|()| {
            let code = r.fixed_str(CODE_WIDTH)?;
            let name = r.fixed_str(NAME_WIDTH)?;
            Ok((code, name))
        });
        match entry {
            Ok((code, name)) if !code.is_empty() && !name.is_empty() => {
                table.entries.insert(code, name);
            }
            Ok(_) => {}
            Err(e) => {
                // Entries are contiguous; nothing past a short entry is readable
                tally.record(index, &e);
                break;
            }
        }
    }

    crate::log_decode!(
        Level::DEBUG,
        market = %table.market_name,
        declared = count,
        accepted = table.len(),
        "symbol table decoded"
    );

    let errors = tally.finish();
    let records = if table.is_empty() {
        Vec::new()
    } else {
        vec![table]
    };
    DecodeOutcome { records, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::symbol_table_packet;

    #[test]
    fn test_entries_keyed_by_raw_code() {
        let data = symbol_table_packet(
            "上海A股",
            &[("600000", "浦发银行"), ("600036", "招商银行"), ("SH601318", "中国平安")],
        );
        let outcome = decode_symbol_table(&data, &DecodeOptions::default());
        assert_eq!(outcome.errors, 0);
        let table = &outcome.records[0];
        assert_eq!(table.market_name, "上海A股");
        assert_eq!(table.market, 0x4853);
        assert_eq!(table.len(), 3);
        assert_eq!(table.entries["600000"], "浦发银行");
        assert_eq!(table.entries["SH601318"], "中国平安");
        assert_eq!(declared_entries(&data), Some(3));
    }

    #[test]
    fn test_entries_at_fixed_offsets() {
        let data = symbol_table_packet("M", &[("000001", "A"), ("000002", "B")]);
        assert_eq!(&data[54..60], b"000001");
        assert_eq!(&data[54 + 44..54 + 44 + 6], b"000002");
    }

    #[test]
    fn test_blank_code_or_name_skipped() {
        let data = symbol_table_packet("M", &[("600000", ""), ("", "Ghost"), ("600036", "B")]);
        let outcome = decode_symbol_table(&data, &DecodeOptions::default());
        let table = &outcome.records[0];
        assert_eq!(table.len(), 1);
        assert!(table.entries.contains_key("600036"));
        assert_eq!(outcome.errors, 0);
    }

    #[test]
    fn test_empty_table_emits_nothing() {
        let data = symbol_table_packet("M", &[]);
        let outcome = decode_symbol_table(&data, &DecodeOptions::default());
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_short_header_yields_nothing() {
        let outcome = decode_symbol_table(&[0u8; 20], &DecodeOptions::default());
        assert!(outcome.is_empty());
        assert_eq!(outcome.errors, 0);
        assert_eq!(declared_entries(&[0u8; 20]), None);
    }

    #[test]
    fn test_truncated_entries_keep_earlier_ones() {
        let mut data = symbol_table_packet("M", &[("600000", "A"), ("600036", "B")]);
        data.truncate(data.len() - 5);
        let outcome = decode_symbol_table(&data, &DecodeOptions::default());
        assert_eq!(outcome.errors, 1);
        assert_eq!(outcome.records[0].len(), 1);
    }
}
