//! Wire builders for tests
//!
//! Each builder writes records exactly as the quotation driver lays them out,
//! so decoder tests can start from well-formed bytes and corrupt them locally.

use crate::decode::layout::{
    self, data_type, CODE_WIDTH, FIVE_MINUTE_STRIDE, FRAME_HEADER_SIZE, HEADER_SENTINEL,
    MINUTE_BAR_SIZE, NAME_WIDTH, QUOTE_RECORD_SIZE, SYMBOL_TABLE_ENTRIES_OFFSET,
    SYMBOL_TABLE_ENTRY_SIZE,
};

/// Epoch seconds for 2024-01-02 09:30:00 +08:00
pub const SESSION_OPEN: u32 = 1_704_159_000;

fn put_str(buf: &mut [u8], offset: usize, width: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    buf[offset..offset + len].copy_from_slice(&bytes[..len]);
}

fn put_f32s(buf: &mut [u8], offset: usize, values: &[f32]) {
    for (i, v) in values.iter().enumerate() {
        let at = offset + i * 4;
        buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
}

/// One quote record
#[derive(Debug, Clone)]
pub struct QuoteRecord {
    pub code: String,
    pub name: String,
    pub market: u16,
    pub trade_time: i32,
    /// last close, open, high, low, price, volume, amount
    pub prices: [f32; 7],
    pub bid_prices: [f32; 5],
    pub bid_volumes: [f32; 5],
    pub ask_prices: [f32; 5],
    pub ask_volumes: [f32; 5],
}

impl QuoteRecord {
    /// Record with a recognizable, level-ordered book
    pub fn new(code: &str, name: &str, price: f32) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            market: 0x4853,
            trade_time: SESSION_OPEN as i32,
            prices: [price - 0.5, price - 0.2, price + 0.3, price - 0.4, price, 12_000.0, 118_000.0],
            bid_prices: [price - 0.01, price - 0.02, price - 0.03, price - 0.04, price - 0.05],
            bid_volumes: [100.0, 200.0, 300.0, 400.0, 500.0],
            ask_prices: [price + 0.01, price + 0.02, price + 0.03, price + 0.04, price + 0.05],
            ask_volumes: [110.0, 210.0, 310.0, 410.0, 510.0],
        }
    }

    pub fn encode(&self) -> [u8; QUOTE_RECORD_SIZE] {
        use layout::quote::*;
        let mut buf = [0u8; QUOTE_RECORD_SIZE];
        buf[RECORD_SIZE..RECORD_SIZE + 2].copy_from_slice(&(QUOTE_RECORD_SIZE as u16).to_le_bytes());
        buf[TRADE_TIME..TRADE_TIME + 4].copy_from_slice(&self.trade_time.to_le_bytes());
        buf[MARKET..MARKET + 2].copy_from_slice(&self.market.to_le_bytes());
        put_str(&mut buf, CODE, CODE_WIDTH, &self.code);
        put_str(&mut buf, NAME, NAME_WIDTH, &self.name);
        put_f32s(&mut buf, PRICES, &self.prices);
        put_f32s(&mut buf, BID_PRICE_L1, &self.bid_prices[..3]);
        put_f32s(&mut buf, BID_VOLUME_L1, &self.bid_volumes[..3]);
        put_f32s(&mut buf, ASK_PRICE_L1, &self.ask_prices[..3]);
        put_f32s(&mut buf, ASK_VOLUME_L1, &self.ask_volumes[..3]);
        for (level, at) in [(3, LEVEL_4), (4, LEVEL_5)] {
            put_f32s(
                &mut buf,
                at,
                &[
                    self.bid_prices[level],
                    self.bid_volumes[level],
                    self.ask_prices[level],
                    self.ask_volumes[level],
                ],
            );
        }
        buf
    }
}

/// Concatenate quote records into one packet body
pub fn quote_packet(records: &[QuoteRecord]) -> Vec<u8> {
    records.iter().flat_map(|r| r.encode()).collect()
}

fn frame_header(code: &str, width: usize) -> Vec<u8> {
    let mut buf = vec![0u8; width];
    buf[0..4].copy_from_slice(&HEADER_SENTINEL.to_le_bytes());
    buf[4..6].copy_from_slice(&0x4853u16.to_le_bytes());
    put_str(&mut buf, layout::FRAME_HEADER_CODE, CODE_WIDTH, code);
    buf
}

/// Builder for the header/bar mixed minute stream
#[derive(Debug, Default)]
pub struct MinuteStream {
    bytes: Vec<u8>,
    slots: usize,
}

impl MinuteStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, code: &str) -> Self {
        self.bytes.extend(frame_header(code, FRAME_HEADER_SIZE));
        self.slots += 1;
        self
    }

    pub fn bar(mut self, time: u32, price: f32, volume: f32, amount: f32) -> Self {
        let mut buf = [0u8; MINUTE_BAR_SIZE];
        buf[0..4].copy_from_slice(&time.to_le_bytes());
        put_f32s(&mut buf, 4, &[price, volume, amount]);
        self.bytes.extend_from_slice(&buf);
        self.slots += 1;
        self
    }

    /// Declared record count for the stream built so far
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn data_type(&self) -> u16 {
        data_type::MINUTE
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Builder for the uniform-stride 5-minute stream
#[derive(Debug, Default)]
pub struct FiveMinuteStream {
    bytes: Vec<u8>,
    slots: usize,
}

impl FiveMinuteStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, code: &str) -> Self {
        self.bytes.extend(frame_header(code, FIVE_MINUTE_STRIDE));
        self.slots += 1;
        self
    }

    /// open, high, low, close, volume, amount, active buy volume
    pub fn bar(mut self, time: u32, values: [f32; 7]) -> Self {
        let mut buf = [0u8; FIVE_MINUTE_STRIDE];
        buf[0..4].copy_from_slice(&time.to_le_bytes());
        put_f32s(&mut buf, 4, &values);
        self.bytes.extend_from_slice(&buf);
        self.slots += 1;
        self
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Symbol table packet: header followed by `(code, name)` entries
pub fn symbol_table_packet(market_name: &str, entries: &[(&str, &str)]) -> Vec<u8> {
    use layout::symbol_table::*;
    let mut buf =
        vec![0u8; SYMBOL_TABLE_ENTRIES_OFFSET + entries.len() * SYMBOL_TABLE_ENTRY_SIZE];
    buf[MARKET..MARKET + 2].copy_from_slice(&0x4853u16.to_le_bytes());
    put_str(&mut buf, MARKET_NAME, MARKET_NAME_WIDTH, market_name);
    buf[ENTRY_COUNT..ENTRY_COUNT + 2].copy_from_slice(&(entries.len() as u16).to_le_bytes());
    for (i, (code, name)) in entries.iter().enumerate() {
        let at = SYMBOL_TABLE_ENTRIES_OFFSET + i * SYMBOL_TABLE_ENTRY_SIZE;
        put_str(&mut buf, at, CODE_WIDTH, code);
        put_str(&mut buf, at + CODE_WIDTH, NAME_WIDTH, name);
        buf[at + CODE_WIDTH + NAME_WIDTH..at + SYMBOL_TABLE_ENTRY_SIZE]
            .copy_from_slice(&2u16.to_le_bytes());
    }
    buf
}
